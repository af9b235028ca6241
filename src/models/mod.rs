//! Domain entities and the mappers that build them from API JSON.
//!
//! Mappers are pure: they decode a record through a `serde` DTO and never
//! touch the network. Cross-entity links (an account's matching recipient)
//! are resolved from lookups passed in by the caller.

pub mod account;
pub mod recipient;
pub mod transaction;

pub use account::{map_account, map_accounts, matching_recipient, Account, Accounts};
pub use recipient::{
    map_recipient, map_recipients, Address, NewRecipient, Recipient, Recipients, RoutingDetails,
    RoutingNumbers,
};
pub use transaction::{
    PaymentMethod, PaymentRequest, TimeWindow, Transaction, TransactionPage, TransactionQuery,
    TransactionStatus,
};
