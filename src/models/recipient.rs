use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{MercuryError, Result};

/// Recipients keyed by name.
pub type Recipients = BTreeMap<String, Arc<Recipient>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    pub status: String,
    /// `None` when the API reports no payment yet (shown as `N/A`).
    pub date_last_paid: Option<String>,
    pub default_payment_method: String,
    pub emails: BTreeSet<String>,
    /// Present only when the recipient has an electronic routing block with
    /// both numbers filled in.
    pub routing: Option<RoutingNumbers>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingNumbers {
    pub account_number: String,
    pub routing_number: String,
}

impl Recipient {
    pub fn account_number(&self) -> Option<&str> {
        self.routing.as_ref().map(|r| r.account_number.as_str())
    }

    pub fn routing_number(&self) -> Option<&str> {
        self.routing.as_ref().map(|r| r.routing_number.as_str())
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Last Paid: {})",
            self.name,
            self.date_last_paid.as_deref().unwrap_or("N/A")
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipientDto {
    id: String,
    name: String,
    status: String,
    #[serde(default)]
    date_last_paid: Option<String>,
    default_payment_method: String,
    emails: Vec<String>,
    #[serde(default)]
    electronic_routing_info: Option<ElectronicRoutingDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElectronicRoutingDto {
    account_number: Option<String>,
    routing_number: Option<String>,
}

impl RecipientDto {
    fn into_domain(self) -> Recipient {
        let routing = match self.electronic_routing_info {
            Some(ElectronicRoutingDto {
                account_number: Some(account_number),
                routing_number: Some(routing_number),
            }) => Some(RoutingNumbers {
                account_number,
                routing_number,
            }),
            Some(_) => {
                debug!(target: "mapping", "Recipient {} has an incomplete routing block", self.name);
                None
            }
            None => None,
        };

        Recipient {
            id: self.id,
            name: self.name,
            status: self.status,
            date_last_paid: self.date_last_paid,
            default_payment_method: self.default_payment_method,
            emails: self.emails.into_iter().collect(),
            routing,
        }
    }
}

/// Map one recipient record.
pub fn map_recipient(json: &Value) -> Result<Recipient> {
    RecipientDto::deserialize(json)
        .map(RecipientDto::into_domain)
        .map_err(|e| MercuryError::decode("recipient", e.to_string()))
}

/// Map a `{"recipients": [...]}` response into a map keyed by name. A later
/// record with the same name replaces an earlier one.
pub fn map_recipients(response: &Value) -> Result<Recipients> {
    let records = response
        .get("recipients")
        .and_then(Value::as_array)
        .ok_or_else(|| MercuryError::decode("recipients", "missing `recipients` array"))?;

    let mut recipients = Recipients::new();
    for record in records {
        let recipient = map_recipient(record)?;
        if let Some(previous) = recipients.insert(recipient.name.clone(), Arc::new(recipient)) {
            debug!(target: "mapping", "Duplicate recipient name {}, replacing {}", previous.name, previous.id);
        }
    }
    Ok(recipients)
}

/// Payload for `POST recipients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipient {
    pub name: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domestic_wire_routing_info: Option<RoutingDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electronic_routing_info: Option<RoutingDetails>,
}

impl NewRecipient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emails: Vec::new(),
            payment_method: default_payment_method(),
            address: None,
            domestic_wire_routing_info: None,
            electronic_routing_info: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MercuryError::InvalidRequest(
                "recipient name is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,
    #[serde(default = "default_account_type")]
    pub electronic_account_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl Default for RoutingDetails {
    fn default() -> Self {
        Self {
            account_number: None,
            bank_name: None,
            routing_number: None,
            electronic_account_type: default_account_type(),
            address: None,
        }
    }
}

fn default_payment_method() -> String {
    "ach".to_string()
}

fn default_account_type() -> String {
    "businessChecking".to_string()
}
