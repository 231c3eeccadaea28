//! CLI binary for the cobranca debt tracking API.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use cobranca_rs::client::CobrancaBlockingClient;
use cobranca_rs::controller::{CommandError, SessionLedgerBlockingController};
use cobranca_rs::error::{CobrancaError, Result};
use cobranca_rs::models::{ChargeDraft, ChargeId, ChargeRecord, Decimal, Identity, PaymentRequest, TaxId};
use cobranca_rs::state::{Family, ViewState};
use cobranca_rs::transport::BlockingTransport;
use cobranca_rs::translator::ViolationTable;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use secrecy::SecretString;

/// Environment variable overriding the backend URL.
const BASE_URL_ENV: &str = "COBRANCA_BASE_URL";

/// Environment variable holding the login tax id.
const TAX_ID_ENV: &str = "COBRANCA_CPF_CNPJ";

/// Environment variable holding the login password.
const PASSWORD_ENV: &str = "COBRANCA_PASSWORD";

/// Cobranca CLI: register, log in and manage charges between parties.
#[derive(Debug, Parser)]
#[command(name = "cobranca", version, about)]
struct Cli {
    /// Backend base URL (default: $COBRANCA_BASE_URL or http://localhost:8000).
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,
    /// JSON file mapping server violation texts to message kinds.
    #[arg(long, global = true, value_name = "FILE")]
    messages: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Show the logged-in entity.
    Whoami,
    /// Register a new entity (password from $COBRANCA_PASSWORD) and log in.
    Signup {
        /// Display name.
        #[arg(long)]
        name: String,
        /// CPF or CNPJ of the new entity.
        #[arg(long = "cpf-cnpj")]
        cpf_cnpj: String,
    },
    /// List the open charges of a debtor.
    Charges {
        /// CPF or CNPJ of the debtor.
        debtor: String,
    },
    /// Create a charge owed to the logged-in entity.
    Charge(ChargeArgs),
    /// Record the payment of a listed charge.
    Pay {
        /// Identifier of the charge being paid.
        charge_id: String,
        /// CPF or CNPJ of the charge's debtor.
        #[arg(long)]
        debtor: String,
    },
    /// End the session held by this process, without logging in first.
    ///
    /// The session cookie lives only as long as the process, so a fresh
    /// invocation usually has nothing to end.
    Logout,
}

/// Arguments for the `charge` subcommand.
#[derive(Debug, Args)]
struct ChargeArgs {
    /// Name of the debtor.
    #[arg(long)]
    debtor_name: String,
    /// CPF or CNPJ of the debtor.
    #[arg(long)]
    debtor: String,
    /// Amount owed, e.g. 100.50.
    #[arg(long, value_parser = parse_amount)]
    amount: Decimal,
}

/// Controller driven by the CLI.
type Controller<T> = SessionLedgerBlockingController<T>;

/// Parses an amount for clap, accepting a decimal comma.
fn parse_amount(s: &str) -> core::result::Result<Decimal, String> {
    s.replace(',', ".")
        .parse::<Decimal>()
        .map_err(|err| format!("{err}"))
}

/// Reads a non-empty environment variable.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|val| !val.is_empty())
}

/// Reports a missing environment variable with a `.env` hint.
fn report_missing_env(name: &str) -> io::Result<()> {
    let mut err = io::stderr().lock();
    writeln!(
        err,
        "{} {} environment variable is not set",
        "error:".red().bold(),
        name.bold()
    )?;
    writeln!(
        err,
        "  {} create a .env file with {}=<value>",
        "hint:".cyan(),
        name
    )
}

/// Parses a violation table override and layers it over the built-in one.
fn parse_violation_table(json: &str) -> Result<ViolationTable> {
    let custom: ViolationTable = serde_json::from_str(json)?;
    Ok(ViolationTable::default().merged(custom))
}

/// Loads the violation table, from `path` if given.
fn load_violation_table(path: Option<&Path>) -> Result<ViolationTable> {
    let Some(file) = path else {
        return Ok(ViolationTable::default());
    };
    let json = std::fs::read_to_string(file)
        .map_err(|err| CobrancaError::Config(format!("{}: {err}", file.display())))?;
    parse_violation_table(&json)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let table = match load_violation_table(cli.messages.as_deref()) {
        Ok(table) => table,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to load messages: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut builder = CobrancaBlockingClient::builder();
    if let Some(url) = cli.base_url.or_else(|| read_env(BASE_URL_ENV)) {
        builder = builder.base_url(url);
    }
    let controller = match builder.build().and_then(|client| {
        SessionLedgerBlockingController::builder()
            .transport(client)
            .violation_table(table)
            .build()
    }) {
        Ok(controller) => controller,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build client: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    dispatch(&controller, cli.command)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<T: BlockingTransport>(ctl: &Controller<T>, command: Command) -> io::Result<ExitCode> {
    if let Command::Signup { name, cpf_cnpj } = command {
        return cmd_signup(ctl, name, TaxId::from(cpf_cnpj));
    }
    if matches!(command, Command::Logout) {
        return cmd_logout(ctl);
    }
    if !ensure_session(ctl)? {
        return Ok(ExitCode::FAILURE);
    }
    match command {
        Command::Whoami => cmd_whoami(ctl),
        Command::Charges { debtor } => cmd_charges(ctl, TaxId::from(debtor)),
        Command::Charge(args) => cmd_charge(ctl, args),
        Command::Pay { charge_id, debtor } => {
            cmd_pay(ctl, &ChargeId::from(charge_id), TaxId::from(debtor))
        }
        Command::Signup { .. } | Command::Logout => Ok(ExitCode::FAILURE),
    }
}

/// Adopts an existing session or logs in with the credentials from the
/// environment. Returns `false` if no session could be established.
fn ensure_session<T: BlockingTransport>(ctl: &Controller<T>) -> io::Result<bool> {
    if ctl.probe_session().is_authenticated() {
        return Ok(true);
    }
    let Some(tax_id) = read_env(TAX_ID_ENV) else {
        report_missing_env(TAX_ID_ENV)?;
        return Ok(false);
    };
    let Some(password) = read_env(PASSWORD_ENV) else {
        report_missing_env(PASSWORD_ENV)?;
        return Ok(false);
    };

    let spinner = make_spinner("Logging in...");
    let outcome = ctl.login(TaxId::from(tax_id), SecretString::from(password));
    spinner.finish_and_clear();
    match outcome {
        Ok(_identity) => Ok(true),
        Err(err) => {
            report_failure("login failed", &err, &ctl.state())?;
            Ok(false)
        }
    }
}

/// Executes the `whoami` subcommand.
fn cmd_whoami<T: BlockingTransport>(ctl: &Controller<T>) -> io::Result<ExitCode> {
    let state = ctl.state();
    let Some(identity) = state.session.identity() else {
        writeln!(io::stderr().lock(), "{} not logged in", "error:".red().bold())?;
        return Ok(ExitCode::FAILURE);
    };
    print_identity(identity)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `signup` subcommand: registers and logs in.
fn cmd_signup<T: BlockingTransport>(
    ctl: &Controller<T>,
    name: String,
    tax_id: TaxId,
) -> io::Result<ExitCode> {
    let password = read_env(PASSWORD_ENV).unwrap_or_default();
    let spinner = make_spinner("Registering...");
    let outcome = ctl.signup(name, tax_id, SecretString::from(password));
    spinner.finish_and_clear();
    match outcome {
        Ok(identity) => {
            writeln!(io::stdout().lock(), "{}", "Registered and logged in.".green().bold())?;
            print_identity(&identity)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure("signup failed", &err, &ctl.state())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `charges` subcommand: lists the open charges of `debtor`.
fn cmd_charges<T: BlockingTransport>(ctl: &Controller<T>, debtor: TaxId) -> io::Result<ExitCode> {
    let spinner = make_spinner("Fetching charges...");
    let outcome = ctl.list_charges(debtor);
    spinner.finish_and_clear();
    match outcome {
        Ok(charges) => {
            print_messages(&ctl.state())?;
            print_charges_table(&charges)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure("listing failed", &err, &ctl.state())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `charge` subcommand: creates a charge, then lists the
/// debtor's open charges.
fn cmd_charge<T: BlockingTransport>(ctl: &Controller<T>, args: ChargeArgs) -> io::Result<ExitCode> {
    let debtor = TaxId::from(args.debtor);
    let draft = ChargeDraft::new(Identity::new(args.debtor_name, debtor.clone()), args.amount);
    ctl.set_draft(draft);

    let spinner = make_spinner("Creating charge...");
    let outcome = ctl.submit_draft();
    spinner.finish_and_clear();
    match outcome {
        Ok(created) => {
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Charge created:".green().bold(),
                created.id
            )?;
            cmd_charges(ctl, debtor)
        }
        Err(err) => {
            report_failure("charge creation failed", &err, &ctl.state())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `pay` subcommand: looks the charge up among the debtor's
/// open charges and records its payment.
fn cmd_pay<T: BlockingTransport>(
    ctl: &Controller<T>,
    charge_id: &ChargeId,
    debtor: TaxId,
) -> io::Result<ExitCode> {
    let charges = match ctl.list_charges(debtor) {
        Ok(charges) => charges,
        Err(err) => {
            report_failure("listing failed", &err, &ctl.state())?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let Some(charge) = charges.iter().find(|charge| charge.id == *charge_id) else {
        writeln!(
            io::stderr().lock(),
            "{} no open charge {charge_id} for this debtor",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    };

    let spinner = make_spinner("Recording payment...");
    let outcome = ctl.record_payment(&PaymentRequest::for_charge(charge));
    spinner.finish_and_clear();
    match outcome {
        Ok(()) => {
            writeln!(io::stdout().lock(), "{}", "Payment recorded.".green().bold())?;
            print_charges_table(&ctl.state().charges)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure("payment failed", &err, &ctl.state())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `logout` subcommand, ending the session only if one exists.
fn cmd_logout<T: BlockingTransport>(ctl: &Controller<T>) -> io::Result<ExitCode> {
    if !ctl.probe_session().is_authenticated() {
        writeln!(io::stdout().lock(), "{}", "No active session.".yellow())?;
        return Ok(ExitCode::SUCCESS);
    }
    ctl.logout();
    writeln!(io::stdout().lock(), "{}", "Logged out.".green().bold())?;
    Ok(ExitCode::SUCCESS)
}

/// Human label of a message family.
const fn family_label(family: Family) -> &'static str {
    match family {
        Family::Login => "login",
        Family::Signup => "signup",
        Family::List => "charges",
        Family::Create => "charge",
        Family::Payment => "payment",
    }
}

/// Prints every surfaced message.
fn print_messages(state: &ViewState) -> io::Result<()> {
    let mut err = io::stderr().lock();
    for (family, text) in state.messages.iter() {
        writeln!(err, "{} {text}", format_args!("[{}]", family_label(family)).yellow())?;
    }
    Ok(())
}

/// Reports a failed command: the surfaced messages, or the error itself
/// when nothing was surfaced.
fn report_failure(context: &str, error: &CommandError, state: &ViewState) -> io::Result<()> {
    if state.messages.is_empty() || error.message().is_none() {
        writeln!(
            io::stderr().lock(),
            "{} {context}: {error}",
            "error:".red().bold()
        )?;
    }
    print_messages(state)
}

/// Prints an identity.
fn print_identity(identity: &Identity) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "  {} {}", "Name:".bold(), identity.name)?;
    writeln!(out, "  {} {}", "CPF/CNPJ:".bold(), identity.tax_id)?;
    if let Some(kind) = identity.kind {
        let label = match kind {
            cobranca_rs::models::EntityKind::Pf => "individual",
            cobranca_rs::models::EntityKind::Pj => "organization",
        };
        writeln!(out, "  {} {label}", "Kind:".bold())?;
    }
    Ok(())
}

/// Prints charges in a table.
fn print_charges_table(charges: &[ChargeRecord]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if charges.is_empty() {
        writeln!(out, "{}", "No open charges.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Creditor").fg(Color::Cyan),
        Cell::new("Debtor").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Created").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for charge in charges {
        let status = if charge.is_paid() {
            Cell::new("paid").fg(Color::Green)
        } else {
            Cell::new("open").fg(Color::Red)
        };
        _ = table.add_row(vec![
            Cell::new(&charge.id),
            Cell::new(&charge.creditor_tax_id),
            Cell::new(&charge.debtor_tax_id),
            Cell::new(format!("{:.2}", charge.amount)),
            Cell::new(charge.display_date()),
            status,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Charges".green().bold(),
        format_args!("({})", charges.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output; if stderr itself failed, nothing
            // we can do.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
