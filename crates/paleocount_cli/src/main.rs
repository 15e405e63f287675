//! Command-line front end over `paleocount_core`.
//!
//! # Responsibility
//! - Resolve configuration, open the store and start logging.
//! - Route `run <session> <entity> <verb> key=value...` to a service.
//! - Print one JSON document per invocation.
//!
//! Exit codes: 0 on success, 2 on an expected failure (the JSON carries the
//! mapped status), 1 on configuration, storage or usage errors.

mod dispatch;
mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use log::info;
use paleocount_core::db::migrations::latest_version;
use paleocount_core::{
    init_logging, open_db, ConfigOverrides, CoreConfig, ParticipationAuthorizer, RawParams,
    SqliteStore, UserService,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "paleocount")]
#[command(about = "Record management for paleontological countings")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database file; overrides config and environment
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or migrate the database
    Init,
    /// Register a user
    Register { name: String, email: String },
    /// Open a session for a user and print its token
    Login { user_id: String },
    /// Revoke a session token
    Logout { session: String },
    /// Run one operation; use `-` as session for guest access
    Run {
        session: String,
        entity: String,
        verb: String,
        /// Parameters as key=value pairs
        params: Vec<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match execute(args) {
        Ok(reply) => {
            println!("{}", reply.body);
            if reply.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(err) => {
            eprintln!("paleocount: {err}");
            ExitCode::from(1)
        }
    }
}

fn execute(args: Args) -> Result<dispatch::Reply, CliError> {
    let overrides = ConfigOverrides { db_path: args.db };
    let config = CoreConfig::resolve(args.config.as_deref(), &overrides)?;
    init_logging(&config.logging)?;

    let conn = open_db(&config.database.path)?;
    let store = SqliteStore::try_new(&conn)?;
    info!(
        "event=cli_start module=cli status=ok command={}",
        command_name(&args.command)
    );

    match args.command {
        Command::Init => Ok(dispatch::Reply::ok(serde_json::json!({
            "database": config.database.path.display().to_string(),
            "schema_version": latest_version(),
        }))),
        Command::Register { name, email } => {
            let raw = RawParams::new().with("name", name).with("email", email);
            dispatch::reply(UserService::new(store).register(&raw))
        }
        Command::Login { user_id } => {
            let raw = RawParams::new().with("user_id", user_id);
            dispatch::reply(UserService::new(store).open_session(&raw))
        }
        Command::Logout { session } => {
            dispatch::reply(UserService::new(store).close_session(&session))
        }
        Command::Run {
            session,
            entity,
            verb,
            params,
        } => {
            let token = (session != "-").then_some(session.as_str());
            let auth = ParticipationAuthorizer::from_session(token, &store)?;
            let raw = RawParams::parse_pairs(params.iter().map(String::as_str));
            dispatch::run(store, &auth, &entity, &verb, &raw)
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Init => "init",
        Command::Register { .. } => "register",
        Command::Login { .. } => "login",
        Command::Logout { .. } => "logout",
        Command::Run { .. } => "run",
    }
}
