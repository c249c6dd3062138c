//! `slotswap` CLI: drive the swap engine against a local database file.
//!
//! ## Usage
//!
//! ```sh
//! slotswap --db swaps.db user add --name alice
//! slotswap --db swaps.db slot add --as <alice> --title "Standup" --start 0 --end 3600000
//! slotswap --db swaps.db slot exchangeable --as <alice> --slot <slot>
//! slotswap --db swaps.db slot market --as <bob>
//! slotswap --db swaps.db propose --as <alice> --offer <slot-a> --request <slot-b>
//! slotswap --db swaps.db respond --as <bob> --proposal <id> --accept
//! slotswap --db swaps.db proposals --as <bob>
//! ```
//!
//! Read results are printed as JSON on stdout; failures print the error code
//! and reason on stderr and exit with status 1.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use log::debug;
use rusqlite::Connection;
use serde::Serialize;
use slotswap_core::db::open_db;
use slotswap_core::{
    default_log_level, init_logging, SlotService, SlotServiceError, SqliteUserRepository,
    SwapError, SwapService, UserProfile, UserRepository,
};
use std::path::PathBuf;
use std::process;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "slotswap", version, about = "Peer-to-peer calendar slot swaps")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "SLOTSWAP_DB", default_value = "slotswap.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "SLOTSWAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, env = "SLOTSWAP_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the user identity projection
    #[command(subcommand)]
    User(UserCommand),
    /// Manage your own slots
    #[command(subcommand)]
    Slot(SlotCommand),
    /// Offer one of your exchangeable slots for someone else's
    Propose {
        #[command(flatten)]
        caller: Caller,
        /// Slot you give
        #[arg(long)]
        offer: Uuid,
        /// Slot you want
        #[arg(long)]
        request: Uuid,
    },
    /// Accept or reject a proposal addressed to you
    #[command(group(ArgGroup::new("decision").required(true).args(["accept", "reject"])))]
    Respond {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        proposal: Uuid,
        #[arg(long)]
        accept: bool,
        #[arg(long)]
        reject: bool,
    },
    /// List your incoming and outgoing proposals
    Proposals(Caller),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register or refresh a user profile
    Add {
        /// Existing identity id; a new one is generated when omitted
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum SlotCommand {
    /// Create an ordinary slot
    Add {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        title: String,
        /// Start, Unix epoch milliseconds
        #[arg(long, allow_negative_numbers = true)]
        start: i64,
        /// End (exclusive), Unix epoch milliseconds
        #[arg(long, allow_negative_numbers = true)]
        end: i64,
    },
    /// List your slots
    List(Caller),
    /// Opt a slot into the marketplace (or out with --off)
    Exchangeable {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        slot: Uuid,
        #[arg(long)]
        off: bool,
    },
    /// List other users' exchangeable slots
    Market(Caller),
}

/// Authenticated caller identity.
#[derive(Args)]
struct Caller {
    /// Acting user id
    #[arg(long = "as", value_name = "USER_ID")]
    user: Uuid,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    debug!("event=cli_start module=cli db={}", cli.db.display());
    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;

    match cli.command {
        Commands::User(UserCommand::Add { id, name, email }) => {
            let mut profile = UserProfile::new(id.unwrap_or_else(Uuid::new_v4), name);
            profile.email = email;
            SqliteUserRepository::try_new(&conn)?.upsert_user(&profile)?;
            print_json(&profile)
        }
        Commands::Slot(command) => run_slot(&mut conn, command),
        Commands::Propose {
            caller,
            offer,
            request,
        } => {
            let mut swaps = SwapService::try_new(&mut conn)?;
            let detail = swaps
                .create_proposal(caller.user, offer, request)
                .map_err(swap_failure)?;
            print_json(&detail)
        }
        Commands::Respond {
            caller,
            proposal,
            accept,
            reject: _,
        } => {
            let mut swaps = SwapService::try_new(&mut conn)?;
            let detail = swaps
                .resolve_proposal(caller.user, proposal, accept)
                .map_err(swap_failure)?;
            print_json(&detail)
        }
        Commands::Proposals(caller) => {
            let swaps = SwapService::try_new(&mut conn)?;
            print_json(&swaps.list_proposals(caller.user).map_err(swap_failure)?)
        }
    }
}

fn run_slot(conn: &mut Connection, command: SlotCommand) -> Result<()> {
    match command {
        SlotCommand::Add {
            caller,
            title,
            start,
            end,
        } => {
            let slot = SlotService::try_new(conn)?
                .create_slot(caller.user, title, start, end)
                .map_err(slot_failure)?;
            print_json(&slot)
        }
        SlotCommand::List(caller) => {
            print_json(&SlotService::try_new(conn)?.list_owned_slots(caller.user)?)
        }
        SlotCommand::Exchangeable { caller, slot, off } => {
            let slot = SlotService::try_new(conn)?
                .set_exchangeable(caller.user, slot, !off)
                .map_err(slot_failure)?;
            print_json(&slot)
        }
        SlotCommand::Market(caller) => {
            let swaps = SwapService::try_new(conn)?;
            print_json(&swaps.list_exchangeable_slots(caller.user).map_err(swap_failure)?)
        }
    }
}

fn swap_failure(err: SwapError) -> anyhow::Error {
    let code = err.code();
    anyhow::Error::new(err).context(code)
}

fn slot_failure(err: SlotServiceError) -> anyhow::Error {
    anyhow::Error::new(err).context("slot_rejected")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}
