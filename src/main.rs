use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use rust_decimal::Decimal;

use mercury_client::app_paths::AppPaths;
use mercury_client::memory::Memory;
use mercury_client::prompt::TerminalPrompter;
use mercury_client::table_display::{
    accounts_table, display_table, export_transactions_csv, recipients_table, transactions_table,
};
use mercury_client::{
    logging, Config, MercuryClient, NewRecipient, PaymentMethod, TimeWindow, TransactionQuery,
    TransactionStatus,
};

#[derive(Parser)]
#[command(name = "mercury", version, about = "Mercury banking from the terminal")]
struct Cli {
    /// Config file (defaults to <config dir>/mercury/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List accounts
    Accounts {
        #[arg(long)]
        force: bool,
    },
    /// List recipients
    Recipients {
        #[arg(long)]
        force: bool,
    },
    /// Fetch one account by id
    Account { id: String },
    /// Fetch one recipient by id
    Recipient { id: String },
    /// Show transaction history of an account
    Transactions {
        /// Account nickname
        nickname: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// pending, sent, cancelled or failed
        #[arg(long)]
        status: Option<TransactionStatus>,
        #[arg(long)]
        search: Option<String>,
        /// Earliest creation time (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_start)]
        start: Option<DateTime<Utc>>,
        /// Latest creation time (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_end)]
        end: Option<DateTime<Utc>>,
        /// Write the transactions to this CSV file instead of a table
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Send money from one of your accounts to a recipient
    Send {
        /// Account nickname
        from: String,
        /// Recipient name or alias
        to: String,
        amount: Decimal,
        #[arg(long, default_value_t = PaymentMethod::Ach)]
        method: PaymentMethod,
    },
    /// Create a recipient, interactively unless a JSON payload is given
    AddRecipient {
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Remember a short alias for a recipient name
    Alias { alias: String, recipient: String },
    /// Write a commented config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_date(value: &str, time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|_| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got {value}"))
}

fn parse_start(value: &str) -> Result<DateTime<Utc>, String> {
    let midnight =
        NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(|| "invalid midnight".to_string())?;
    parse_date(value, midnight)
}

/// A bare date as the end bound covers that whole day.
fn parse_end(value: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| "invalid end-of-day time".to_string())?;
    parse_date(value, end_of_day)
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn init_config(path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.clone(),
        None => AppPaths::config_file()?,
    };
    if path.exists() && !force {
        bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, Config::create_default_with_comments())?;
    println!("Configuration file created at: {}", path.display());
    println!("Put your API key in {}", Config::default().key_path_hint()?.display());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    if let Command::InitConfig { force } = cli.command {
        return init_config(cli.config.as_ref(), force);
    }

    let config = load_config(cli.config.as_ref())?;
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    if let Some(log_path) = logging::init_tracing(config.log_dir().ok().as_deref(), default_filter)
    {
        if cli.verbose > 0 {
            eprintln!("Logs: {}", log_path.display());
        }
    }

    if let Command::Alias { alias, recipient } = &cli.command {
        let memory_path = config.memory_file()?;
        let mut memory = Memory::load_or_init(&memory_path)?;
        if let Some(previous) = memory.set_alias(alias.as_str(), recipient.as_str()) {
            println!("{}", format!("{alias} was {previous}").yellow());
        }
        memory.save(&memory_path)?;
        println!("{}", format!("{alias} -> {recipient}").green());
        return Ok(());
    }

    let mut client = MercuryClient::from_config(&config)?;

    match cli.command {
        Command::Accounts { force } => {
            let accounts = client.accounts(force)?;
            display_table(&accounts_table(accounts.values()), accounts.len(), "accounts");
        }
        Command::Recipients { force } => {
            let recipients = client.recipients(force)?;
            display_table(
                &recipients_table(recipients.values().map(|r| r.as_ref())),
                recipients.len(),
                "recipients",
            );
        }
        Command::Account { id } => {
            let account = client.get_account(&id)?;
            display_table(&accounts_table([&account]), 1, "account");
        }
        Command::Recipient { id } => {
            let recipient = client.get_recipient(&id)?;
            display_table(&recipients_table([&recipient]), 1, "recipient");
        }
        Command::Transactions {
            nickname,
            limit,
            offset,
            status,
            search,
            start,
            end,
            csv,
        } => {
            let mut query = TransactionQuery::new().offset(offset);
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(status) = status {
                query = query.status(status);
            }
            if let Some(search) = search {
                query = query.search(search);
            }
            if start.is_some() || end.is_some() {
                query = query.window(TimeWindow::new(start, end)?);
            }

            let page = client.account(&nickname, false)?.transactions(&query)?;
            match csv {
                Some(path) => export_transactions_csv(&path, &page.transactions)?,
                None => {
                    display_table(
                        &transactions_table(&page.transactions),
                        page.transactions.len(),
                        "transactions",
                    );
                    if let Some(total) = page.total {
                        println!("{}", format!("{total} in total").dark_grey());
                    }
                }
            }
        }
        Command::Send {
            from,
            to,
            amount,
            method,
        } => {
            let memory = Memory::load_or_init(&config.memory_file()?)?;
            let name = memory.resolve(&to);
            let recipient = client.recipient(name, false)?;
            let account = client.account(&from, false)?;

            println!(
                "{}",
                format!("Sending ${amount} from {account} to {recipient} via {method}").cyan()
            );
            let reply = account.send(amount, &recipient, method)?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::AddRecipient { payload } => {
            let payload = match payload {
                Some(path) => {
                    let contents = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let payload: NewRecipient = serde_json::from_str(&contents)
                        .with_context(|| format!("parsing {}", path.display()))?;
                    Some(payload)
                }
                None => {
                    let prompter = TerminalPrompter::stdio()
                        .with_default_emails(config.default_emails())
                        .with_last_recipient_path(config.last_recipient_file()?);
                    client = client.with_prompter(Box::new(prompter));
                    None
                }
            };
            let reply = client.add_recipient(payload)?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
            println!(
                "{}",
                "Run `mercury recipients --force` to see the new recipient.".dark_grey()
            );
        }
        Command::Alias { .. } | Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {e:#}").red());
        std::process::exit(1);
    }
}
