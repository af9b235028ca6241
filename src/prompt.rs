//! Interactive composition of a new recipient.
//!
//! The terminal prompter walks a fixed template: plain fields are asked once
//! and fall back to their default on an empty answer; nested sections
//! (addresses, routing blocks) are only entered after a y/n confirmation.

use std::fs;
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{MercuryError, Result};
use crate::models::{Address, NewRecipient, RoutingDetails};

/// Supplies a recipient payload when `add_recipient` is called without one.
pub trait RecipientPrompter {
    fn prompt_recipient(&mut self) -> Result<NewRecipient>;
}

pub struct TerminalPrompter<R, W> {
    reader: R,
    writer: W,
    default_emails: Vec<String>,
    last_recipient_path: Option<PathBuf>,
}

impl TerminalPrompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            default_emails: Vec::new(),
            last_recipient_path: None,
        }
    }

    /// Emails attached to every recipient composed by this prompter.
    pub fn with_default_emails(mut self, emails: Vec<String>) -> Self {
        self.default_emails = emails;
        self
    }

    /// Where the last composed recipient is written, for reuse by hand.
    pub fn with_last_recipient_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.last_recipient_path = Some(path.into());
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn ask(&mut self, field: &str) -> Result<Option<String>> {
        write!(self.writer, "{field}: ")?;
        self.writer.flush()?;

        let mut input = String::new();
        let read = self.reader.read_line(&mut input)?;
        if read == 0 {
            return Err(MercuryError::InvalidRequest(format!(
                "input closed while asking for {field}"
            )));
        }
        let answer = input.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    fn ask_or(&mut self, field: &str, default: &str) -> Result<String> {
        Ok(self.ask(field)?.unwrap_or_else(|| default.to_string()))
    }

    fn step_into(&mut self, section: &str) -> Result<bool> {
        let answer = self.ask(&format!("Step into \"{section}\"? (y/n)"))?;
        Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y")))
    }

    fn address(&mut self, section: &str) -> Result<Option<Address>> {
        if !self.step_into(section)? {
            return Ok(None);
        }
        Ok(Some(Address {
            address1: self.ask("address1")?,
            address2: self.ask("address2")?,
            city: self.ask("city")?,
            region: self.ask("region")?,
            postal_code: self.ask("postalCode")?,
            country: self.ask("country")?,
        }))
    }

    fn routing(&mut self, section: &str) -> Result<Option<RoutingDetails>> {
        if !self.step_into(section)? {
            return Ok(None);
        }
        Ok(Some(RoutingDetails {
            account_number: self.ask("accountNumber")?,
            bank_name: self.ask("bankName")?,
            routing_number: self.ask("routingNumber")?,
            address: self.address("address")?,
            ..RoutingDetails::default()
        }))
    }

    fn persist(&self, recipient: &NewRecipient) -> Result<()> {
        let Some(path) = &self.last_recipient_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(recipient)?)?;
        debug!(target: "prompt", "Saved last recipient to {}", path.display());
        Ok(())
    }
}

impl<R: BufRead, W: Write> RecipientPrompter for TerminalPrompter<R, W> {
    fn prompt_recipient(&mut self) -> Result<NewRecipient> {
        let name = self.ask("name")?.unwrap_or_default();
        let address = self.address("address")?;
        let payment_method = self.ask_or("paymentMethod", "ach")?;
        let domestic_wire_routing_info = self.routing("domesticWireRoutingInfo")?;
        let electronic_routing_info = self.routing("electronicRoutingInfo")?;

        let recipient = NewRecipient {
            name,
            emails: self.default_emails.clone(),
            payment_method,
            address,
            domestic_wire_routing_info,
            electronic_routing_info,
        };
        recipient.validate()?;

        self.persist(&recipient)?;
        info!(target: "prompt", "Composed recipient {}", recipient.name);
        Ok(recipient)
    }
}
