use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use cipherchat::{
    Config, DEFAULT_MIN_MESSAGE_LEN, DocumentStore, EnvelopeId, KdfParams, ListedEnvelope,
    MessageStatus, Messenger, Session, validate_body,
};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod auth;
mod shell;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB for new password hashes (default: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 1)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self) -> Result<KdfParams> {
        let default = KdfParams::default();

        KdfParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )
    }
}

#[derive(Debug, Parser)]
#[command(name = "cipherchat")]
#[command(
    version,
    about = "Terminal chat where every message is sealed with a passphrase."
)]
struct Cli {
    /// Path to the chat store file
    #[arg(long, global = true, value_name = "PATH", env = "CIPHERCHAT_STORE")]
    store: Option<PathBuf>,

    /// Username to act as
    #[arg(long, short, global = true, env = "CIPHERCHAT_USER")]
    user: Option<String>,

    /// Minimum message length accepted when sending
    #[arg(
        long = "min-length",
        global = true,
        env = "CIPHERCHAT_MIN_LENGTH",
        default_value_t = DEFAULT_MIN_MESSAGE_LEN
    )]
    min_length: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates an account for --user
    Register {
        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Seals a message with a passphrase and sends it
    #[command(arg_required_else_help = true)]
    Send { to: String, message: String },

    /// Lists received messages, newest first
    Inbox {
        /// List messages already read instead of new ones
        #[arg(long, default_value_t = false)]
        read: bool,
    },

    /// Opens a message by id and marks it read
    #[command(arg_required_else_help = true)]
    Open { id: String },

    /// Interactive menu
    Shell {
        #[command(flatten)]
        argon2: Argon2Args,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn require_user(user: Option<&str>) -> Result<&str> {
    match user.map(str::trim) {
        Some(u) if !u.is_empty() => Ok(u),
        _ => bail!("no user given; pass --user or set CIPHERCHAT_USER"),
    }
}

fn login(config: Config, user: Option<&str>) -> Result<(Messenger<DocumentStore>, Session)> {
    let username = require_user(user)?;
    let password = auth::read_password()?;
    let messenger = Messenger::open(config);
    let session = messenger
        .login(username, &password)
        .context("login failed")?;
    Ok((messenger, session))
}

/// Width of the "From" column: the longest `@name`, counted in characters.
fn from_column_width(entries: &[ListedEnvelope]) -> usize {
    entries
        .iter()
        .map(|e| e.from.chars().count() + 1)
        .chain(std::iter::once("From".len()))
        .max()
        .unwrap_or(4)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Cli::parse();
    let config = Config::resolve(args.store.clone())?.with_min_message_len(args.min_length);
    let user = args.user.as_deref();

    match args.command {
        Commands::Register { argon2 } => {
            let username = require_user(user)?;
            let password = auth::read_new_password()?;
            let mut messenger = Messenger::open(config.with_kdf(argon2.to_kdf_params()?));
            messenger.register(username, &password)?;
            println!("user '{username}' registered");
        }
        Commands::Send { to, message } => {
            validate_body(&message, config.min_message_len())?;
            let (mut messenger, session) = login(config, user)?;
            let passphrase = auth::read_passphrase()?;
            let id = messenger.send(&session, &to, &message, &passphrase)?;
            println!("message {id} sent to @{}", to.trim());
        }
        Commands::Inbox { read } => {
            let status = if read {
                MessageStatus::Read
            } else {
                MessageStatus::Unread
            };
            let (messenger, session) = login(config, user)?;
            let listing = messenger.inbox(&session, status)?;

            if listing.is_empty() {
                println!("No {status} messages.");
                return Ok(());
            }

            let from_width = from_column_width(listing.entries());

            println!("{:<3}  {:<24}  {:<from_width$}  Received", "#", "Id", "From");
            for e in listing.entries() {
                println!(
                    "{:<3}  {:<24}  {:<from_width$}  {}",
                    e.position,
                    e.id,
                    format!("@{}", e.from),
                    shell::format_timestamp(e.timestamp)
                );
            }
        }
        Commands::Open { id } => {
            let id = EnvelopeId::parse(&id)?;
            let (mut messenger, session) = login(config, user)?;
            let passphrase = auth::read_passphrase()?;
            let msg = messenger.read(&session, &id, &passphrase)?;

            println!(
                "From: @{} - {}",
                msg.from,
                shell::format_timestamp(msg.timestamp)
            );
            println!("{}", msg.body);
        }
        Commands::Shell { argon2 } => {
            let mut messenger = Messenger::open(config.with_kdf(argon2.to_kdf_params()?));
            let stdin = io::stdin();
            let hide_secrets = stdin.is_terminal();
            shell::Shell::new(&mut messenger, stdin.lock(), io::stdout(), hide_secrets).run()?;
        }
    }

    Ok(())
}
