use std::io::Write;
use std::path::Path;

use anyhow::Result;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use crossterm::style::Stylize;

use crate::models::{Account, Recipient, Transaction};

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn money(cell: impl ToString) -> Cell {
    Cell::new(cell.to_string()).set_alignment(CellAlignment::Right)
}

fn or_blank(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

pub fn accounts_table<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&[
        "Nickname",
        "Name",
        "Account #",
        "Kind",
        "Status",
        "Available",
        "Current",
        "Recipient",
    ]));

    for account in accounts {
        table.add_row(vec![
            Cell::new(&account.nickname),
            Cell::new(&account.name),
            Cell::new(&account.account_number),
            Cell::new(&account.kind),
            Cell::new(&account.status),
            money(account.available_balance),
            money(account.current_balance),
            Cell::new(
                account
                    .as_recipient
                    .as_ref()
                    .map(|r| r.name.as_str())
                    .unwrap_or("-"),
            ),
        ]);
    }
    table
}

pub fn recipients_table<'a>(recipients: impl IntoIterator<Item = &'a Recipient>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&[
        "Name",
        "Status",
        "Method",
        "Account #",
        "Routing #",
        "Last Paid",
    ]));

    for recipient in recipients {
        table.add_row(vec![
            Cell::new(&recipient.name),
            Cell::new(&recipient.status),
            Cell::new(&recipient.default_payment_method),
            Cell::new(or_blank(recipient.account_number())),
            Cell::new(or_blank(recipient.routing_number())),
            Cell::new(recipient.date_last_paid.as_deref().unwrap_or("N/A")),
        ]);
    }
    table
}

pub fn transactions_table(transactions: &[Transaction]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["Created", "Amount", "Status", "Counterparty", "Note"]));

    for tx in transactions {
        table.add_row(vec![
            Cell::new(tx.created_at.format("%Y-%m-%d %H:%M")),
            money(tx.amount),
            Cell::new(&tx.status),
            Cell::new(or_blank(tx.counterparty_name.as_deref())),
            Cell::new(or_blank(tx.note.as_deref())),
        ]);
    }
    table
}

pub fn display_table(table: &Table, rows: usize, what: &str) {
    if rows == 0 {
        println!("{}", format!("No {what} found.").yellow());
        return;
    }
    println!("{table}");
    println!("\n{}", format!("{rows} {what}").green());
}

/// Write transactions as CSV with a fixed header row.
pub fn write_transactions_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "id",
        "createdAt",
        "postedAt",
        "amount",
        "status",
        "counterpartyName",
        "kind",
        "note",
        "bankDescription",
        "externalMemo",
    ])?;

    for tx in transactions {
        wtr.write_record([
            tx.id.clone(),
            tx.created_at.to_rfc3339(),
            tx.posted_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
            tx.amount.to_string(),
            tx.status.to_string(),
            tx.counterparty_name.clone().unwrap_or_default(),
            tx.kind.clone().unwrap_or_default(),
            tx.note.clone().unwrap_or_default(),
            tx.bank_description.clone().unwrap_or_default(),
            tx.external_memo.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_transactions_csv(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_transactions_csv(file, transactions)?;
    println!(
        "{}",
        format!("{} transactions exported to {}", transactions.len(), path.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{map_recipients, TransactionPage};
    use serde_json::json;

    fn transactions() -> Vec<Transaction> {
        let page: TransactionPage = serde_json::from_value(json!({
            "transactions": [
                {"id": "t1", "amount": -12.5, "status": "sent", "createdAt": "2024-01-02T10:00:00Z",
                 "counterpartyName": "Acme, Inc.", "note": "invoice 7"},
                {"id": "t2", "amount": 100, "status": "pending", "createdAt": "2024-01-03T11:30:00Z"}
            ]
        }))
        .unwrap();
        page.transactions
    }

    #[test]
    fn test_transactions_csv_quotes_and_blanks() {
        let mut out = Vec::new();
        write_transactions_csv(&mut out, &transactions()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,createdAt,postedAt,amount,status"));
        assert!(lines[1].contains("\"Acme, Inc.\""));
        assert!(lines[1].contains("-12.5"));
        assert!(lines[2].starts_with("t2,2024-01-03T11:30:00+00:00,,100,pending"));
    }

    #[test]
    fn test_recipient_table_shows_missing_payment_date() {
        let recipients = map_recipients(&json!({
            "recipients": [{
                "id": "r1", "name": "Acme", "status": "active",
                "defaultPaymentMethod": "ach", "emails": []
            }]
        }))
        .unwrap();

        let rendered = recipients_table(recipients.values().map(|r| r.as_ref())).to_string();
        assert!(rendered.contains("Acme"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_transactions_table_has_row_per_transaction() {
        let table = transactions_table(&transactions());
        assert_eq!(table.row_iter().count(), 2);
    }
}
