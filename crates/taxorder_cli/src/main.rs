//! Operator CLI for the term ordering core.
//!
//! Drives the same services a host would call: backfill, ordered listing and
//! reorder submission, against one SQLite database file.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use taxorder_core::db::open_db;
use taxorder_core::{
    default_log_level, handle_reorder, init_logging, NewTerm, OrderMaintainer, OrderingConfig,
    QueryContext, SqlitePositionStore, SqliteTermRepository, TermListingService, TermQuery,
    TermRepository, TermSort,
};

#[derive(Parser, Debug)]
#[command(name = "taxorder", version, about = "Custom display order for taxonomy terms")]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "taxorder.db")]
    db: PathBuf,
    /// JSON ordering config; without it no taxonomy is registered.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long)]
    log_dir: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints core health and version.
    Ping,
    /// Creates one term.
    AddTerm {
        #[arg(long)]
        taxonomy: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long, default_value_t = 0)]
        items: u32,
    },
    /// Assigns positions to terms that have none.
    Backfill {
        #[arg(long)]
        taxonomy: String,
    },
    /// Lists terms in persisted order as JSON.
    List {
        #[arg(long = "taxonomy", required = true)]
        taxonomies: Vec<String>,
        /// Treat the request as coming from the admin screen.
        #[arg(long)]
        admin: bool,
        /// Explicit admin sort (`name|count|id [asc|desc]`); overrides custom
        /// positions.
        #[arg(long, requires = "admin")]
        orderby: Option<TermSort>,
        #[arg(long)]
        hide_empty: bool,
    },
    /// Applies a reorder payload given inline or on stdin.
    Reorder {
        #[arg(long)]
        payload: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    if let Command::Ping = cli.command {
        println!("taxorder_core ping={}", taxorder_core::ping());
        println!("taxorder_core version={}", taxorder_core::core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let config = match cli.config.as_ref() {
        Some(path) => OrderingConfig::load(path)?,
        None => OrderingConfig::new(),
    };
    let conn = open_db(&cli.db)?;
    info!("event=cli_command module=cli status=start command={:?}", cli.command);

    match cli.command {
        Command::Ping => {}
        Command::AddTerm {
            taxonomy,
            name,
            parent,
            items,
        } => {
            let mut new_term = NewTerm::new(taxonomy, name).with_item_count(items);
            if let Some(parent_id) = parent {
                new_term = new_term.with_parent(parent_id);
            }
            let term = SqliteTermRepository::try_new(&conn)?.create_term(&new_term)?;
            println!("{}", serde_json::to_string(&term)?);
        }
        Command::Backfill { taxonomy } => {
            let maintainer = OrderMaintainer::new(
                SqliteTermRepository::try_new(&conn)?,
                SqlitePositionStore::try_new(&conn)?,
                config,
            );
            let report = maintainer.ensure_positions(&taxonomy)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::List {
            taxonomies,
            admin,
            orderby,
            hide_empty,
        } => {
            let context = if admin {
                QueryContext::Admin {
                    explicit_sort: orderby,
                }
            } else {
                QueryContext::Public
            };
            if admin {
                let maintainer = OrderMaintainer::new(
                    SqliteTermRepository::try_new(&conn)?,
                    SqlitePositionStore::try_new(&conn)?,
                    config.clone(),
                );
                for taxonomy in &taxonomies {
                    maintainer.ensure_positions(taxonomy)?;
                }
            }
            let listing = TermListingService::new(SqliteTermRepository::try_new(&conn)?, config);
            let query = TermQuery::new(taxonomies).hide_empty(hide_empty);
            let terms = listing.list_terms(&query, &context)?;
            println!("{}", serde_json::to_string_pretty(&terms)?);
        }
        Command::Reorder { payload } => {
            let body = match payload {
                Some(body) => body,
                None => {
                    let mut body = String::new();
                    std::io::stdin().read_to_string(&mut body)?;
                    body
                }
            };
            let maintainer = OrderMaintainer::new(
                SqliteTermRepository::try_new(&conn)?,
                SqlitePositionStore::try_new(&conn)?,
                config,
            );
            match handle_reorder(&maintainer, &body) {
                Ok(response) => println!("{}", serde_json::to_string(&response)?),
                Err(err) => {
                    println!("{}", err.to_json());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
