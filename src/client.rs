//! The entry point: owns the session and the two collection caches.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mockable::{Clock, DefaultClock};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheStatus, FailurePolicy, StalenessCache, DEFAULT_TTL};
use crate::config::Config;
use crate::credentials::ApiKey;
use crate::error::{MercuryError, Result};
use crate::models::{
    map_account, map_accounts, map_recipient, map_recipients, Account, Accounts, NewRecipient,
    Recipient, Recipients,
};
use crate::prompt::RecipientPrompter;
use crate::transport::{HttpTransport, Session};

/// Cache state of both collections, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheReport {
    pub accounts: CacheStatus,
    pub recipients: CacheStatus,
}

pub struct MercuryClient {
    session: Session,
    accounts: StalenessCache<Accounts>,
    recipients: StalenessCache<Recipients>,
    prompter: Option<Box<dyn RecipientPrompter>>,
}

pub struct ClientBuilder {
    session: Session,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    policy: FailurePolicy,
    prompter: Option<Box<dyn RecipientPrompter>>,
}

impl ClientBuilder {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn prompter(mut self, prompter: Box<dyn RecipientPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Build the client and fetch both collections. Any failure aborts.
    pub fn connect(self) -> Result<MercuryClient> {
        let mut client = MercuryClient {
            session: self.session,
            accounts: StalenessCache::with_clock("accounts", self.ttl, self.clock.clone())
                .with_policy(self.policy),
            recipients: StalenessCache::with_clock("recipients", self.ttl, self.clock)
                .with_policy(self.policy),
            prompter: self.prompter,
        };

        // Accounts link to recipients, so recipients go first.
        client.recipients(true)?;
        client.accounts(true)?;
        Ok(client)
    }
}

impl MercuryClient {
    pub fn builder(session: Session) -> ClientBuilder {
        ClientBuilder {
            session,
            ttl: DEFAULT_TTL,
            clock: Arc::new(DefaultClock),
            policy: FailurePolicy::default(),
            prompter: None,
        }
    }

    /// Read the API key named by `config`, open an HTTP session and connect.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let key_path = config.key_path()?;
        let key = ApiKey::from_file(&key_path)?;
        let transport = HttpTransport::new(&config.api_url(), key, config.timeout())?;
        info!(target: "client", "Connecting to {}", transport.base_url());

        let client = Self::builder(Session::new(Arc::new(transport)))
            .ttl(config.cache_ttl())
            .failure_policy(config.cache.on_refresh_failure)
            .connect()
            .context("initial fetch of recipients and accounts failed")?;
        Ok(client)
    }

    /// Attach or replace the prompter used by `add_recipient(None)`.
    pub fn with_prompter(mut self, prompter: Box<dyn RecipientPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Accounts keyed by nickname. A refresh also reads the recipient cache,
    /// which refreshes itself first when stale.
    pub fn accounts(&mut self, force: bool) -> Result<&Accounts> {
        let session = &self.session;
        let recipients = &mut self.recipients;
        self.accounts.get(force, || {
            let recipients = recipients.get(false, || fetch_recipients(session))?;
            fetch_accounts(session, recipients)
        })
    }

    /// Recipients keyed by name.
    pub fn recipients(&mut self, force: bool) -> Result<&Recipients> {
        let session = &self.session;
        self.recipients.get(force, || fetch_recipients(session))
    }

    pub fn account(&mut self, nickname: &str, force: bool) -> Result<&Account> {
        self.accounts(force)?
            .get(nickname)
            .ok_or_else(|| MercuryError::not_found("account", nickname))
    }

    pub fn recipient(&mut self, name: &str, force: bool) -> Result<Arc<Recipient>> {
        self.recipients(force)?
            .get(name)
            .cloned()
            .ok_or_else(|| MercuryError::not_found("recipient", name))
    }

    /// Create a recipient. Without a payload the configured prompter is asked
    /// for one. Returns the API response as-is; the recipient cache is not
    /// updated, so a later `recipients(true)` is needed to see the new entry.
    pub fn add_recipient(&mut self, payload: Option<NewRecipient>) -> Result<Value> {
        let payload = match payload {
            Some(payload) => payload,
            None => match self.prompter.as_mut() {
                Some(prompter) => prompter.prompt_recipient()?,
                None => {
                    return Err(MercuryError::InvalidRequest(
                        "no recipient payload given and no prompter configured".to_string(),
                    ))
                }
            },
        };
        payload.validate()?;

        info!(target: "client", "Adding recipient {}", payload.name);
        let body = serde_json::to_value(&payload)?;
        self.session.post("recipients", &body)
    }

    /// Fetch one account straight from the API. The result is not cached.
    pub fn get_account(&mut self, id: &str) -> Result<Account> {
        let response = self.session.get(&format!("account/{id}"), &[])?;
        let session = &self.session;
        let recipients = self.recipients.get(false, || fetch_recipients(session))?;
        map_account(&response, session, recipients)
    }

    /// Fetch one recipient straight from the API. The result is not cached.
    pub fn get_recipient(&self, id: &str) -> Result<Recipient> {
        let response = self.session.get(&format!("recipient/{id}"), &[])?;
        map_recipient(&response)
    }

    pub fn cache_status(&self) -> CacheReport {
        CacheReport {
            accounts: self.accounts.status(),
            recipients: self.recipients.status(),
        }
    }
}

fn fetch_recipients(session: &Session) -> Result<Recipients> {
    info!(target: "client", "Getting recipients...");
    let response = session.get("recipients", &[])?;
    let recipients = map_recipients(&response)?;
    debug!(target: "client", "Mapped {} recipients", recipients.len());
    Ok(recipients)
}

fn fetch_accounts(session: &Session, recipients: &Recipients) -> Result<Accounts> {
    info!(target: "client", "Getting accounts...");
    let response = session.get("accounts", &[])?;
    let accounts = map_accounts(&response, session, recipients)?;
    debug!(target: "client", "Mapped {} accounts", accounts.len());
    Ok(accounts)
}
