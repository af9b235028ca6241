//! Time-gated cache for the account and recipient collections.
//!
//! A [`StalenessCache`] holds one whole collection and the instant it was last
//! fetched. Reads within the TTL are served from memory; older reads, forced
//! reads and the very first read call the supplied fetch closure and replace
//! the collection wholesale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::{Clock, DefaultClock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MercuryError, Result};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// What a cache does when a refresh fails.
///
/// In both modes the previously cached value and its timestamp are left
/// untouched, so the next read retries the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Return [`MercuryError::Refresh`] to the caller.
    #[default]
    Propagate,
    /// Hand back the last good value with a warning; only error when there is
    /// nothing to hand back.
    ServeStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Never fetched successfully and no attempt has failed yet.
    Empty,
    Fresh,
    /// Holds a value older than the TTL; the next read refetches.
    Expired,
    /// Last refresh failed; an older value is still held.
    FailedKeepingStale,
    /// Last refresh failed and no value was ever fetched.
    FailedEmpty,
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    refreshed_at: DateTime<Utc>,
}

pub struct StalenessCache<T> {
    name: &'static str,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    policy: FailurePolicy,
    entry: Option<CacheEntry<T>>,
    last_error: Option<String>,
}

impl<T> StalenessCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_clock(name, ttl, Arc::new(DefaultClock))
    }

    pub fn with_clock(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            // A TTL beyond chrono's range never expires.
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            policy: FailurePolicy::default(),
            entry: None,
            last_error: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Returns the collection, refreshing it first when `force` is set or
    /// the cached copy is older than the TTL.
    pub fn get<F>(&mut self, force: bool, fetch: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if force || self.is_stale() {
            if force {
                debug!(target: "cache", "Forced refresh of {}", self.name);
            } else {
                info!(target: "cache", "Updating {} data from remote", self.name);
            }

            match fetch() {
                Ok(value) => {
                    self.entry = Some(CacheEntry {
                        value,
                        refreshed_at: self.clock.utc(),
                    });
                    self.last_error = None;
                }
                Err(error) => {
                    self.last_error = Some(error.to_string());
                    let stale_retained = self.entry.is_some();
                    if stale_retained && self.policy == FailurePolicy::ServeStale {
                        warn!(target: "cache", "Refreshing {} failed, serving stale copy: {}", self.name, error);
                    } else {
                        warn!(target: "cache", "Refreshing {} failed: {}", self.name, error);
                        return Err(MercuryError::Refresh {
                            collection: self.name,
                            stale_retained,
                            source: Box::new(error),
                        });
                    }
                }
            }
        }

        self.peek().ok_or_else(|| MercuryError::not_found("cached collection", self.name))
    }

    /// The cached value, without any freshness check or fetch.
    pub fn peek(&self) -> Option<&T> {
        self.entry.as_ref().map(|entry| &entry.value)
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|entry| entry.refreshed_at)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_stale(&self) -> bool {
        match &self.entry {
            None => true,
            Some(entry) => self.clock.utc() - entry.refreshed_at >= self.ttl,
        }
    }

    pub fn status(&self) -> CacheStatus {
        match (&self.entry, &self.last_error) {
            (None, None) => CacheStatus::Empty,
            (None, Some(_)) => CacheStatus::FailedEmpty,
            (Some(_), Some(_)) => CacheStatus::FailedKeepingStale,
            (Some(_), None) if self.is_stale() => CacheStatus::Expired,
            (Some(_), None) => CacheStatus::Fresh,
        }
    }
}
