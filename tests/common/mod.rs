#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use serde_json::{json, Value};

use mercury_client::{MercuryError, Result, Session, Transport};

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    /// The request never reached the API.
    Down(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Transport answering each path with a scripted reply and logging every
/// request it sees.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<Request>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `path` with `reply` from now on.
    pub fn respond(&self, path: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(path.to_string(), reply);
    }

    pub fn respond_json(&self, path: &str, body: Value) {
        self.respond(path, Reply::Json(body));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn answer(&self, request: Request) -> Result<Value> {
        let reply = self.replies.lock().unwrap().get(&request.path).cloned();
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);
        match reply {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Down(message)) => Err(MercuryError::Transport {
                message: message.to_string(),
            }),
            None => Err(MercuryError::Status {
                status: 404,
                body: format!("no stub for {path}"),
            }),
        }
    }
}

impl Transport for StubTransport {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.answer(Request {
            method: "GET",
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: None,
        })
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.answer(Request {
            method: "POST",
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        })
    }
}

pub fn session(transport: &Arc<StubTransport>) -> Session {
    Session::new(transport.clone())
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        )))
    }

    pub fn advance(&self, delta: Duration) {
        *self.0.lock().unwrap() += TimeDelta::from_std(delta).unwrap();
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn recipient_json(id: &str, name: &str, account_number: Option<&str>) -> Value {
    let mut json = json!({
        "id": id,
        "name": name,
        "status": "active",
        "defaultPaymentMethod": "ach",
        "emails": ["ops@example.com"],
    });
    if let Some(number) = account_number {
        json["electronicRoutingInfo"] = json!({
            "accountNumber": number,
            "routingNumber": "084106768",
            "bankName": "Evolve Bank & Trust",
        });
    }
    json
}

pub fn account_json(id: &str, nickname: &str, account_number: &str) -> Value {
    json!({
        "id": id,
        "accountNumber": account_number,
        "routingNumber": "084106768",
        "name": "Mercury Checking",
        "nickname": nickname,
        "type": "mercury",
        "kind": "checking",
        "status": "active",
        "createdAt": "2023-01-10T15:00:00Z",
        "availableBalance": 2500.75,
        "currentBalance": 2600,
        "canReceiveTransactions": true
    })
}

/// A transport preloaded with two recipients and two accounts; the `Ops`
/// account has a matching recipient, `Payroll` does not.
pub fn populated_transport() -> Arc<StubTransport> {
    let transport = StubTransport::new();
    transport.respond_json(
        "recipients",
        json!({
            "recipients": [
                recipient_json("rec-ops", "Ops Self", Some("111")),
                recipient_json("rec-acme", "Acme Supplies", Some("999")),
            ]
        }),
    );
    transport.respond_json(
        "accounts",
        json!({
            "accounts": [
                account_json("acc-ops", "Ops", "111"),
                account_json("acc-pay", "Payroll", "222"),
            ],
            "auth_key": "k"
        }),
    );
    transport
}
