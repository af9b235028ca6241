use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MercuryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    Pending,
    Sent,
    Cancelled,
    Failed,
    /// Any status this client does not know about.
    #[serde(other)]
    Other,
}

impl TransactionStatus {
    /// Value accepted by the `status` query filter.
    pub fn as_filter(&self) -> Result<&'static str> {
        match self {
            Self::Pending => Ok("pending"),
            Self::Sent => Ok("sent"),
            Self::Cancelled => Ok("cancelled"),
            Self::Failed => Ok("failed"),
            Self::Other => Err(MercuryError::InvalidRequest(
                r#"status must be "pending" | "sent" | "cancelled" | "failed""#.to_string(),
            )),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter().unwrap_or("other"))
    }
}

impl FromStr for TransactionStatus {
    type Err = MercuryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            other => Err(MercuryError::InvalidRequest(format!(
                r#"unknown status "{other}": expected "pending" | "sent" | "cancelled" | "failed""#
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub counterparty_id: Option<String>,
    pub counterparty_name: Option<String>,
    pub kind: Option<String>,
    pub note: Option<String>,
    pub bank_description: Option<String>,
    pub external_memo: Option<String>,
    pub dashboard_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub total: Option<u64>,
    pub transactions: Vec<Transaction>,
}

/// Client-side filter on `created_at`. Both bounds are inclusive; a missing
/// bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(MercuryError::InvalidRequest(format!(
                    "window start {start} is after end {end}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *at >= start) && self.end.map_or(true, |end| *at <= end)
    }
}

/// Parameters for `GET account/{id}/transactions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    pub limit: Option<u32>,
    pub offset: u32,
    pub status: Option<TransactionStatus>,
    pub search: Option<String>,
    pub window: Option<TimeWindow>,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn to_params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = vec![("offset", self.offset.to_string())];
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.as_filter()?.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    #[default]
    Ach,
    Check,
    DomesticWire,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ach => "ach",
            Self::Check => "check",
            Self::DomesticWire => "domesticWire",
        })
    }
}

impl FromStr for PaymentMethod {
    type Err = MercuryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ach" => Ok(Self::Ach),
            "check" => Ok(Self::Check),
            "domesticwire" | "domestic-wire" | "wire" => Ok(Self::DomesticWire),
            other => Err(MercuryError::InvalidRequest(format!(
                "unknown payment method {other}"
            ))),
        }
    }
}

/// Body of `POST account/{id}/transactions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub recipient_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub idempotency_key: String,
}

impl PaymentRequest {
    /// Builds a request with a freshly generated idempotency key, so the API
    /// can deduplicate a resubmission of this exact request.
    pub fn new(recipient_id: impl Into<String>, amount: Decimal, method: PaymentMethod) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(MercuryError::InvalidRequest(format!(
                "amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            recipient_id: recipient_id.into(),
            amount,
            payment_method: method,
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }
}
