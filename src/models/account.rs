use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::recipient::{Recipient, Recipients};
use super::transaction::{PaymentMethod, PaymentRequest, TransactionPage, TransactionQuery};
use crate::error::{MercuryError, Result};
use crate::transport::Session;

/// Accounts keyed by nickname.
pub type Accounts = BTreeMap<String, Account>;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub account_number: String,
    pub routing_number: String,
    pub name: String,
    /// Falls back to `name` when the API omits it.
    pub nickname: String,
    pub account_type: String,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub available_balance: Decimal,
    pub current_balance: Decimal,
    pub can_receive_transactions: bool,
    /// The recipient registered for this same account number, if any.
    pub as_recipient: Option<Arc<Recipient>>,
    session: Session,
}

impl Account {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sends `amount` to `to`. Returns the raw API confirmation; balances on
    /// this value are not updated.
    pub fn send(&self, amount: Decimal, to: &Recipient, method: PaymentMethod) -> Result<Value> {
        let request = PaymentRequest::new(&to.id, amount, method)?;
        info!(target: "account", "Sending ${} to {} from {}", amount, to.name, self.nickname);
        debug!(target: "account", idempotency_key = %request.idempotency_key, "payment request built");

        let body = serde_json::to_value(&request)?;
        self.session.post(&self.transactions_path(), &body)
    }

    /// Fetches one page of transaction history, then applies the query's time
    /// window on `created_at` if one is set.
    pub fn transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        let params = query.to_params()?;
        let response = self.session.get(&self.transactions_path(), &params)?;
        let mut page = TransactionPage::deserialize(&response)
            .map_err(|e| MercuryError::decode("transactions", e.to_string()))?;

        if let Some(window) = &query.window {
            let before = page.transactions.len();
            page.transactions.retain(|tx| window.contains(&tx.created_at));
            debug!(target: "account", "Time window kept {} of {} transactions", page.transactions.len(), before);
        }
        Ok(page)
    }

    fn transactions_path(&self) -> String {
        format!("account/{}/transactions", self.id)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} #{})", self.nickname, self.name, self.account_number)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountDto {
    id: String,
    account_number: String,
    routing_number: String,
    name: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(rename = "type")]
    account_type: String,
    kind: String,
    status: String,
    created_at: DateTime<Utc>,
    available_balance: Decimal,
    current_balance: Decimal,
    can_receive_transactions: bool,
}

impl AccountDto {
    fn into_domain(self, session: &Session, recipients: &Recipients) -> Account {
        let nickname = self.nickname.unwrap_or_else(|| self.name.clone());
        let as_recipient = matching_recipient(recipients, &self.account_number);
        if as_recipient.is_none() {
            info!(
                target: "mapping",
                "No recipient found for {} ({} #{}) - add one with add_recipient",
                nickname, self.name, self.account_number
            );
        }

        Account {
            id: self.id,
            account_number: self.account_number,
            routing_number: self.routing_number,
            name: self.name,
            nickname,
            account_type: self.account_type,
            kind: self.kind,
            status: self.status,
            created_at: self.created_at,
            available_balance: self.available_balance,
            current_balance: self.current_balance,
            can_receive_transactions: self.can_receive_transactions,
            as_recipient,
            session: session.clone(),
        }
    }
}

/// Finds the recipient whose electronic routing account number equals
/// `account_number`. The first match in name order wins.
pub fn matching_recipient(recipients: &Recipients, account_number: &str) -> Option<Arc<Recipient>> {
    let mut matches = recipients
        .values()
        .filter(|recipient| recipient.account_number() == Some(account_number));
    let found = matches.next().cloned();
    if let (Some(first), Some(other)) = (&found, matches.next()) {
        warn!(
            target: "mapping",
            "Account number {} matches several recipients ({}, {}); using {}",
            account_number, first.name, other.name, first.name
        );
    }
    found
}

/// Map one account record. `recipients` is the lookup used to resolve the
/// account's back-reference; nothing is fetched here.
pub fn map_account(json: &Value, session: &Session, recipients: &Recipients) -> Result<Account> {
    AccountDto::deserialize(json)
        .map(|dto| dto.into_domain(session, recipients))
        .map_err(|e| MercuryError::decode("account", e.to_string()))
}

/// Map an `{"accounts": [...]}` response into a map keyed by nickname. A later
/// record with the same nickname replaces an earlier one.
pub fn map_accounts(response: &Value, session: &Session, recipients: &Recipients) -> Result<Accounts> {
    let records = response
        .get("accounts")
        .and_then(Value::as_array)
        .ok_or_else(|| MercuryError::decode("accounts", "missing `accounts` array"))?;

    let mut accounts = Accounts::new();
    for record in records {
        let account = map_account(record, session, recipients)?;
        if let Some(previous) = accounts.insert(account.nickname.clone(), account) {
            debug!(target: "mapping", "Duplicate account nickname {}, replacing {}", previous.nickname, previous.id);
        }
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recipient::map_recipients;
    use crate::transport::Transport;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<(String, String, Value)>>,
        reply: Value,
    }

    impl Transport for RecordingTransport {
        fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
            let query: Vec<Value> = query.iter().map(|(k, v)| json!([k, v])).collect();
            self.requests
                .lock()
                .unwrap()
                .push(("GET".to_string(), path.to_string(), Value::Array(query)));
            Ok(self.reply.clone())
        }

        fn post(&self, path: &str, body: &Value) -> Result<Value> {
            self.requests
                .lock()
                .unwrap()
                .push(("POST".to_string(), path.to_string(), body.clone()));
            Ok(self.reply.clone())
        }
    }

    fn account_json(nickname: Option<&str>, account_number: &str) -> Value {
        let mut json = json!({
            "id": format!("acc-{account_number}"),
            "accountNumber": account_number,
            "routingNumber": "084106768",
            "name": "Mercury Checking",
            "type": "mercury",
            "kind": "checking",
            "status": "active",
            "createdAt": "2023-06-01T09:30:00Z",
            "availableBalance": 1520.25,
            "currentBalance": 1600,
            "canReceiveTransactions": true
        });
        if let Some(nickname) = nickname {
            json["nickname"] = json!(nickname);
        }
        json
    }

    fn recipients() -> Recipients {
        map_recipients(&json!({
            "recipients": [{
                "id": "rec-ops",
                "name": "Ops Self",
                "status": "active",
                "defaultPaymentMethod": "ach",
                "emails": [],
                "electronicRoutingInfo": {"accountNumber": "111", "routingNumber": "084106768"}
            }]
        }))
        .unwrap()
    }

    fn session(reply: Value) -> (Arc<RecordingTransport>, Session) {
        let transport = Arc::new(RecordingTransport {
            reply,
            ..RecordingTransport::default()
        });
        (transport.clone(), Session::new(transport))
    }

    #[test]
    fn test_account_links_matching_recipient() {
        let (_, session) = session(Value::Null);
        let recipients = recipients();

        let account = map_account(&account_json(Some("Ops"), "111"), &session, &recipients).unwrap();

        assert_eq!(account.as_recipient.as_deref(), Some(&*recipients["Ops Self"]));
        assert_eq!(account.available_balance, "1520.25".parse::<Decimal>().unwrap());
        assert_eq!(account.to_string(), "Ops (Mercury Checking #111)");
        assert_eq!(account.session(), &session);
    }

    #[test]
    fn test_account_without_match_has_no_back_reference() {
        let (_, session) = session(Value::Null);
        let account = map_account(&account_json(Some("Ops"), "999"), &session, &recipients()).unwrap();
        assert!(account.as_recipient.is_none());
    }

    #[test]
    fn test_nickname_defaults_to_name() {
        let (_, session) = session(Value::Null);
        let account = map_account(&account_json(None, "111"), &session, &Recipients::new()).unwrap();
        assert_eq!(account.nickname, "Mercury Checking");
    }

    #[test]
    fn test_missing_required_field_fails_mapping() {
        let (_, session) = session(Value::Null);
        let mut json = account_json(Some("Ops"), "111");
        json.as_object_mut().unwrap().remove("routingNumber");

        let err = map_account(&json, &session, &Recipients::new()).unwrap_err();
        assert!(matches!(err, MercuryError::Decode { entity: "account", .. }));
    }

    #[test]
    fn test_nickname_collision_keeps_later_account() {
        let (_, session) = session(Value::Null);
        let response = json!({
            "accounts": [account_json(Some("Ops"), "111"), account_json(Some("Ops"), "222")]
        });

        let accounts = map_accounts(&response, &session, &recipients()).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts["Ops"].account_number, "222");
        assert!(accounts["Ops"].as_recipient.is_none());
    }

    #[test]
    fn test_duplicate_account_numbers_pick_first_recipient_by_name() {
        let recipients = map_recipients(&json!({
            "recipients": [
                {"id": "b", "name": "Beta", "status": "active", "defaultPaymentMethod": "ach", "emails": [],
                 "electronicRoutingInfo": {"accountNumber": "111", "routingNumber": "1"}},
                {"id": "a", "name": "Alpha", "status": "active", "defaultPaymentMethod": "ach", "emails": [],
                 "electronicRoutingInfo": {"accountNumber": "111", "routingNumber": "1"}}
            ]
        }))
        .unwrap();

        let found = matching_recipient(&recipients, "111").unwrap();
        assert_eq!(found.id, "a");
    }

    #[test]
    fn test_send_posts_payment_with_fresh_idempotency_keys() {
        let (transport, session) = session(json!({"id": "tx-1", "status": "pending"}));
        let recipients = recipients();
        let account = map_account(&account_json(Some("Ops"), "222"), &session, &recipients).unwrap();
        let to = &recipients["Ops Self"];
        let amount = "42.10".parse::<Decimal>().unwrap();

        let reply = account.send(amount, to, PaymentMethod::Ach).unwrap();
        account.send(amount, to, PaymentMethod::Ach).unwrap();

        assert_eq!(reply["status"], "pending");
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let (method, path, body) = &requests[0];
        assert_eq!(method, "POST");
        assert_eq!(path, "account/acc-222/transactions");
        assert_eq!(body["recipientId"], "rec-ops");
        assert_eq!(body["amount"], json!(42.1));
        assert_ne!(body["idempotencyKey"], requests[1].2["idempotencyKey"]);
    }

    #[test]
    fn test_send_rejects_zero_amount_without_request() {
        let (transport, session) = session(Value::Null);
        let recipients = recipients();
        let account = map_account(&account_json(Some("Ops"), "222"), &session, &recipients).unwrap();

        assert!(account
            .send(Decimal::ZERO, &recipients["Ops Self"], PaymentMethod::Ach)
            .is_err());
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_transactions_filters_window_client_side() {
        use crate::models::transaction::TimeWindow;
        use chrono::TimeZone;

        let (transport, session) = session(json!({
            "total": 3,
            "transactions": [
                {"id": "t1", "amount": 1, "status": "sent", "createdAt": "2024-01-01T00:00:00Z"},
                {"id": "t2", "amount": 2, "status": "sent", "createdAt": "2024-01-15T00:00:00Z"},
                {"id": "t3", "amount": 3, "status": "pending", "createdAt": "2024-02-01T00:00:00Z"}
            ]
        }));
        let account = map_account(&account_json(Some("Ops"), "222"), &session, &Recipients::new()).unwrap();
        let window = TimeWindow::new(
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()),
        )
        .unwrap();

        let page = account
            .transactions(&TransactionQuery::new().limit(10).window(window))
            .unwrap();

        let ids: Vec<_> = page.transactions.iter().map(|tx| tx.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(page.total, Some(3));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].1, "account/acc-222/transactions");
        assert_eq!(requests[0].2, json!([["offset", "0"], ["limit", "10"]]));
    }

    #[test]
    fn test_transactions_surface_upstream_errors() {
        let (_, session) = session(json!({"errors": {"message": "account not found"}}));
        let account = map_account(&account_json(Some("Ops"), "222"), &session, &Recipients::new()).unwrap();

        let err = account.transactions(&TransactionQuery::new()).unwrap_err();
        assert!(matches!(err, MercuryError::Upstream { message } if message == "account not found"));
    }
}
