//! Blocking client for the Mercury banking API.
//!
//! [`MercuryClient`] keeps accounts and recipients in time-gated caches and
//! maps API JSON onto typed entities. Payments and transaction history are
//! issued from an [`Account`].

pub mod app_paths;
pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod table_display;
pub mod transport;

pub use cache::{CacheStatus, FailurePolicy, StalenessCache};
pub use client::{CacheReport, ClientBuilder, MercuryClient};
pub use config::Config;
pub use credentials::ApiKey;
pub use error::{MercuryError, Result};
pub use models::{
    Account, Accounts, NewRecipient, PaymentMethod, Recipient, Recipients, TimeWindow,
    Transaction, TransactionPage, TransactionQuery, TransactionStatus,
};
pub use transport::{HttpTransport, Session, Transport};
