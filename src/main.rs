use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use concert_draft_lib::{
    config::ConfigStore,
    db::Store,
    fetch::FetchError,
    from_label, logging,
    models::{ConcertStatus, Source, SourceType},
};

#[derive(Parser)]
#[command(
    name = "concert-draft",
    about = "Turn Japanese concert announcements into ticket timelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse announcement text into a draft (reads stdin without FILE or with "-")
    Parse { file: Option<PathBuf> },
    /// Fetch an announcement page and parse it
    Fetch { url: String },
    /// Store a draft: reviewed draft JSON or raw announcement text
    Commit {
        file: Option<PathBuf>,
        /// Where the announcement came from
        #[arg(long)]
        url: Option<String>,
        /// tweet, news or manual
        #[arg(long = "type", default_value = "manual")]
        source_type: String,
    },
    /// List stored concerts with today's timeline status
    List,
    /// Toggle one milestone between planned and done
    Toggle { concert: String, milestone: String },
    /// Set a concert status: planned, confirmed, attended, cancelled
    SetStatus { concert: String, status: String },
    /// Delete a stored concert
    Delete { concert: String },
    /// Show or change the persisted configuration
    Config {
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        backup_retention: Option<usize>,
    },
}

fn main() -> ExitCode {
    let _guard = logging::init_logging();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<FetchError>() {
                Some(fetch_err) => eprintln!("{}", fetch_err.user_message()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    let config_store = ConfigStore::load();
    let config = config_store.read();

    match command {
        Command::Parse { file } => {
            let text = read_input(file)?;
            print_json(&concert_draft_lib::parse_text(&text, &config)?)
        }
        Command::Fetch { url } => {
            let ctx = concert_draft_lib::parse_context(&config)?;
            let draft = concert_draft_lib::fetch_and_parse(&url, &config, &ctx)?;
            print_json(&draft)
        }
        Command::Commit {
            file,
            url,
            source_type,
        } => {
            let ctx = concert_draft_lib::parse_context(&config)?;
            let input = read_input(file)?;
            let draft = concert_draft_lib::load_draft(&input, &ctx);
            let source = Source {
                kind: from_label::<SourceType>(&source_type)?,
                url,
            };
            let store = Store::open_default(&config)?;
            print_json(&concert_draft_lib::commit_draft(&store, draft, source)?)
        }
        Command::List => {
            let ctx = concert_draft_lib::parse_context(&config)?;
            let store = Store::open_default(&config)?;
            print_json(&concert_draft_lib::list_concerts(&store, ctx.today)?)
        }
        Command::Toggle { concert, milestone } => {
            let store = Store::open_default(&config)?;
            print_json(&concert_draft_lib::toggle_milestone(
                &store, &concert, &milestone,
            )?)
        }
        Command::SetStatus { concert, status } => {
            let status = from_label::<ConcertStatus>(&status)?;
            let store = Store::open_default(&config)?;
            print_json(&concert_draft_lib::set_status(&store, &concert, status)?)
        }
        Command::Delete { concert } => {
            let store = Store::open_default(&config)?;
            concert_draft_lib::delete_concert(&store, &concert)?;
            print_json(&serde_json::json!({ "deleted": concert }))
        }
        Command::Config {
            timezone,
            backup_retention,
        } => {
            if timezone.is_none() && backup_retention.is_none() {
                return print_json(&config);
            }
            let updated = config_store.update(|cfg| {
                if let Some(tz) = timezone {
                    cfg.timezone = tz;
                }
                if let Some(retention) = backup_retention {
                    cfg.backup_retention = retention;
                }
            })?;
            print_json(&updated)
        }
    }
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
