use dbdesk::config::{default_config_path, load_config, load_config_or_default, Config};
use dbdesk::core::db::{ConnectParams, ConnectionRegistry};
use dbdesk::core::{DbdeskError, Result};
use dbdesk::repl::{run_repl, Shell};
use dbdesk::storage::{QueryHistory, SqliteHistoryStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "Usage: dbdesk [--config <path>] [--history <path>] [sqlite-file]";

/// Command-line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    history: Option<PathBuf>,
    database: Option<String>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(flag_value(&mut args, "--config")?.into()),
            "--history" => parsed.history = Some(flag_value(&mut args, "--history")?.into()),
            flag if flag.starts_with("--") => {
                return Err(DbdeskError::Command(format!("Unknown option {}\n{}", flag, USAGE)))
            }
            _ if parsed.database.is_none() => parsed.database = Some(arg),
            _ => return Err(DbdeskError::Command(USAGE.to_string())),
        }
    }
    Ok(parsed)
}

fn flag_value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| DbdeskError::Command(format!("{} requires a value\n{}", flag, USAGE)))
}

fn load(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => load_config(path),
        None => match default_config_path() {
            Some(path) => load_config_or_default(path),
            None => Ok(Config::default()),
        },
    }
}

fn run(args: Args) -> Result<()> {
    let config = load(&args)?;
    let limit = config.history_limit();
    let store = match args.history.clone().or_else(|| config.history_path()) {
        Some(path) => SqliteHistoryStore::new(&path)?,
        None => SqliteHistoryStore::in_memory()?,
    };
    let history = QueryHistory::load_with_limit(store, limit)?;
    let mut shell = Shell::new(ConnectionRegistry::new(), history, config);

    if let Some(path) = args.database {
        info!("Opening database {}", path);
        shell.open("main", ConnectParams::sqlite(path), &mut std::io::stdout())?;
    }
    run_repl(&mut shell)
}

fn main() -> ExitCode {
    // Logs go to stderr so query output on stdout stays clean
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    info!("Starting dbdesk...");
    let result = parse_args(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_flags_and_database() {
        let parsed = args(&["--history", "/tmp/h.db", "shop.db", "--config", "c.toml"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                config: Some(PathBuf::from("c.toml")),
                history: Some(PathBuf::from("/tmp/h.db")),
                database: Some("shop.db".to_string()),
            }
        );
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(matches!(args(&["--config"]), Err(DbdeskError::Command(_))));
        assert!(matches!(args(&["--verbose"]), Err(DbdeskError::Command(_))));
        assert!(matches!(args(&["a.db", "b.db"]), Err(DbdeskError::Command(_))));
    }
}
