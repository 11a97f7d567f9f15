use crate::config::Config;
use crate::core::db::{ConnectParams, ConnectionRegistry, Connector, QueryResult};
use crate::core::Result;
use crate::query_builder::{BuilderVariant, JoinKind, QuerySession};
use crate::results_grid::ResultsGrid;
use crate::storage::{HistoryStore, QueryHistory};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Represents a parsed shell command.
#[derive(Debug, PartialEq)]
pub enum Command {
    OpenSqlite {
        name: String,
        path: String,
    },
    OpenPostgres {
        name: String,
        database: String,
        host: Option<String>,
        user: Option<String>,
        password: Option<String>,
        port: i32,
    },
    Profile(String),
    Close(String),
    Use(String),
    Connections,
    Tables,
    Columns(String),
    Preview(String),
    Begin,
    Commit,
    Rollback,
    Export(String),
    Format(String),
    /// List the history, or re-run the numbered entry
    Hist(Option<usize>),
    ClearHist,
    Builder(BuilderCommand),
    Help,
    Quit,
    Sql(String),
    Unknown(String),
}

/// Sub-commands of `:qb`, the query builder.
#[derive(Debug, PartialEq)]
pub enum BuilderCommand {
    New(BuilderVariant),
    Table(String),
    Column(String),
    Uncolumn(String),
    Join {
        kind: Option<JoinKind>,
        table: String,
        condition: String,
    },
    Where(String),
    Show,
    Run,
    Cancel,
}

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parses a user input string into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a command.
/// Otherwise, it is treated as a SQL query.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if !input.starts_with(':') {
        return Command::Sql(input.to_string());
    }
    let trimmed = &input[1..];
    let (keyword, rest) = split_word(trimmed);
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let unknown = || Command::Unknown(input.to_string());

    match keyword {
        "open" => match parts.as_slice() {
            [name, path] => Command::OpenSqlite {
                name: name.to_string(),
                path: path.to_string(),
            },
            _ => unknown(),
        },
        "pg" => {
            if parts.len() < 2 || parts.len() > 6 {
                return unknown();
            }
            let field = |i: usize| parts.get(i).map(|s| s.to_string());
            let port = match parts.get(5).map(|p| p.parse::<i32>()) {
                None => -1,
                Some(Ok(port)) => port,
                Some(Err(_)) => return unknown(),
            };
            Command::OpenPostgres {
                name: parts[0].to_string(),
                database: parts[1].to_string(),
                host: field(2),
                user: field(3),
                password: field(4),
                port,
            }
        }
        "connect" => single(&parts).map(Command::Profile).unwrap_or_else(unknown),
        "close" => single(&parts).map(Command::Close).unwrap_or_else(unknown),
        "use" => single(&parts).map(Command::Use).unwrap_or_else(unknown),
        "conns" => Command::Connections,
        "tables" => Command::Tables,
        "columns" => single(&parts).map(Command::Columns).unwrap_or_else(unknown),
        "preview" => single(&parts).map(Command::Preview).unwrap_or_else(unknown),
        "begin" => Command::Begin,
        "commit" => Command::Commit,
        "rollback" => Command::Rollback,
        "export" => single(&parts).map(Command::Export).unwrap_or_else(unknown),
        "format" => single(&parts).map(Command::Format).unwrap_or_else(unknown),
        "hist" => match parts.as_slice() {
            [] => Command::Hist(None),
            [n] => n.parse().map(|n| Command::Hist(Some(n))).unwrap_or_else(|_| unknown()),
            _ => unknown(),
        },
        "clearhist" => Command::ClearHist,
        "qb" => parse_builder_command(rest)
            .map(Command::Builder)
            .unwrap_or_else(unknown),
        "help" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => unknown(),
    }
}

fn parse_builder_command(input: &str) -> Option<BuilderCommand> {
    let (keyword, rest) = split_word(input);
    let argument = || Some(rest.to_string()).filter(|s| !s.is_empty());
    match keyword {
        "new" => Some(BuilderCommand::New(BuilderVariant::Extended)),
        "minimal" => Some(BuilderCommand::New(BuilderVariant::Minimal)),
        "table" => argument().map(BuilderCommand::Table),
        "col" => argument().map(BuilderCommand::Column),
        "uncol" => argument().map(BuilderCommand::Uncolumn),
        "where" => argument().map(BuilderCommand::Where),
        "join" => parse_join(rest),
        "show" => Some(BuilderCommand::Show),
        "run" => Some(BuilderCommand::Run),
        "cancel" => Some(BuilderCommand::Cancel),
        _ => None,
    }
}

/// `[inner|left|right] <table text> ON <condition>`
fn parse_join(input: &str) -> Option<BuilderCommand> {
    let split = input.find(" ON ").or_else(|| input.find(" on "))?;
    let (target, condition) = (input[..split].trim(), input[split + 4..].trim());
    let (first, remainder) = split_word(target);
    let (kind, table) = match JoinKind::parse(first) {
        Some(kind) if !remainder.is_empty() => (Some(kind), remainder),
        _ => (None, target),
    };
    Some(BuilderCommand::Join {
        kind,
        table: table.to_string(),
        condition: condition.to_string(),
    })
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn single(parts: &[&str]) -> Option<String> {
    match parts {
        [value] => Some(value.to_string()),
        _ => None,
    }
}

const HELP: &str = "Available commands:
  :open <name> <path> - Open a SQLite database file
  :pg <name> <db> [host] [user] [password] [port] - Open a PostgreSQL database
  :connect <profile> - Open a connection saved in the config file
  :close <name> - Close a connection
  :use <name> - Switch the current connection
  :conns - List open connections
  :tables - List tables of the current connection
  :columns <table> - List columns of a table
  :preview <table> - Show the first rows of a table
  :begin / :commit / :rollback - Transaction control
  :export <path> - Write the last result as CSV
  :format <csv|json|markdown> - Print the last result in a format
  :hist - Show query history
  :hist <n> - Run history entry n again
  :clearhist - Clear query history
  :qb new|minimal - Start the query builder on the current connection
  :qb table <t> | col <c> | uncol <c> | where <cond> - Edit the query
  :qb join [inner|left|right] <table> ON <cond> - Add a join
  :qb show | run | cancel - Show, run or drop the built query
  :quit - Exit

Or enter SQL queries directly without any prefix.";

/// Interactive front end over a registry, a query history and the config.
pub struct Shell<C: Connector, S: HistoryStore> {
    registry: ConnectionRegistry<C>,
    history: QueryHistory<S>,
    config: Config,
    current: Option<String>,
    builder: Option<QuerySession>,
    last_result: Option<QueryResult>,
}

impl<C: Connector, S: HistoryStore> Shell<C, S> {
    pub fn new(registry: ConnectionRegistry<C>, history: QueryHistory<S>, config: Config) -> Self {
        Shell {
            registry,
            history,
            config,
            current: None,
            builder: None,
            last_result: None,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn history(&self) -> &QueryHistory<S> {
        &self.history
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn builder(&self) -> Option<&QuerySession> {
        self.builder.as_ref()
    }

    /// Opens a connection and makes it current
    pub fn open<W: Write>(&mut self, name: &str, params: ConnectParams, out: &mut W) -> Result<()> {
        match self.registry.connect(name, params) {
            Ok(()) => {
                self.current = Some(name.to_string());
                writeln!(out, "Connected successfully: {}", name)?;
            }
            Err(_) => writeln!(out, "Error: {}", self.registry.last_error())?,
        }
        Ok(())
    }

    /// Reads commands until `:quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        write!(out, "> ")?;
        out.flush()?;
        for line in input.lines() {
            let line = line?;
            if self.handle(parse_command(&line), out)? == Flow::Quit {
                break;
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }

    pub fn handle<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        debug!(?command, "Handling command");
        match command {
            Command::OpenSqlite { name, path } => {
                self.open(&name, ConnectParams::sqlite(path), out)?;
            }
            Command::OpenPostgres {
                name,
                database,
                host,
                user,
                password,
                port,
            } => {
                let params = ConnectParams {
                    host,
                    user,
                    password,
                    port,
                    ..ConnectParams::postgres(database)
                };
                self.open(&name, params, out)?;
            }
            Command::Profile(profile) => match self.config.profile(&profile) {
                Some(p) => {
                    let params = p.params();
                    self.open(&profile, params, out)?;
                }
                None => writeln!(out, "Error: No saved connection named {}", profile)?,
            },
            Command::Close(name) => {
                if !self.registry.contains(&name) {
                    writeln!(out, "Error: Connection not found: {}", name)?;
                    return Ok(Flow::Continue);
                }
                self.registry.disconnect(&name);
                if self.current.as_deref() == Some(name.as_str()) {
                    self.current = self.registry.active_connections().into_iter().next();
                }
                if self.builder.as_ref().map(QuerySession::connection) == Some(name.as_str()) {
                    self.builder = None;
                }
                writeln!(out, "Disconnected: {}", name)?;
            }
            Command::Use(name) => {
                if self.registry.contains(&name) {
                    self.current = Some(name.clone());
                    writeln!(out, "Using {}", name)?;
                    self.print_tables(&name, out)?;
                } else {
                    writeln!(out, "Error: Connection not found: {}", name)?;
                }
            }
            Command::Connections => {
                let active = self.registry.active_connections();
                if active.is_empty() {
                    writeln!(out, "(no connections)")?;
                }
                for name in active {
                    let marker = if self.current.as_deref() == Some(name.as_str()) { "*" } else { " " };
                    let kind = self
                        .registry
                        .kind_of(&name)
                        .map(|k| k.to_string())
                        .unwrap_or_default();
                    writeln!(out, "{} {} ({})", marker, name, kind)?;
                }
            }
            Command::Tables => {
                if let Some(name) = self.require_connection(out)? {
                    self.print_tables(&name, out)?;
                }
            }
            Command::Columns(table) => {
                if let Some(name) = self.require_connection(out)? {
                    let columns = self.registry.list_columns(&table, &name);
                    if columns.is_empty() {
                        writeln!(out, "(no columns)")?;
                    }
                    for column in columns {
                        writeln!(out, "{}", column)?;
                    }
                }
            }
            Command::Preview(table) => {
                if let Some(name) = self.require_connection(out)? {
                    let limit = self.config.preview_limit();
                    let result = self.registry.preview_table(&table, &name, limit);
                    self.show_result(result, out)?;
                }
            }
            Command::Begin => self.transaction(out, "Transaction started", |r, n| r.begin_transaction(n))?,
            Command::Commit => self.transaction(out, "Committed", |r, n| r.commit_transaction(n))?,
            Command::Rollback => self.transaction(out, "Rolled back", |r, n| r.rollback_transaction(n))?,
            Command::Export(path) => match &self.last_result {
                Some(result) => {
                    let grid = ResultsGrid::from(result.clone());
                    match grid.export_csv_to(&PathBuf::from(&path)) {
                        Ok(()) => writeln!(out, "Data exported successfully")?,
                        Err(e) => writeln!(out, "Error: {}", e)?,
                    }
                }
                None => writeln!(out, "Error: No results to export")?,
            },
            Command::Format(format) => match &self.last_result {
                Some(result) => match ResultsGrid::from(result.clone()).export(&format) {
                    Ok(text) => write!(out, "{}", text)?,
                    Err(e) => writeln!(out, "Error: {}", e)?,
                },
                None => writeln!(out, "Error: No results to export")?,
            },
            Command::Hist(None) => {
                for (i, query) in self.history.entries().iter().enumerate() {
                    writeln!(out, "{:>3}  {}", i + 1, query)?;
                }
            }
            Command::Hist(Some(n)) => {
                let entry = n
                    .checked_sub(1)
                    .and_then(|i| self.history.entries().get(i))
                    .cloned();
                match entry {
                    Some(sql) => {
                        writeln!(out, "{}", sql)?;
                        self.run_sql(&sql, out)?;
                    }
                    None => writeln!(out, "Error: No history entry {}", n)?,
                }
            }
            Command::ClearHist => match self.history.clear() {
                Ok(()) => writeln!(out, "History cleared")?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
            Command::Builder(command) => self.handle_builder(command, out)?,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Sql(sql) => {
                if sql.is_empty() {
                    writeln!(out, "Error: Query is empty")?;
                } else {
                    self.run_sql(&sql, out)?;
                }
            }
            Command::Unknown(input) => {
                writeln!(out, "Unknown command: {} (type :help)", input)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_builder<W: Write>(&mut self, command: BuilderCommand, out: &mut W) -> Result<()> {
        if let BuilderCommand::New(variant) = command {
            if let Some(name) = self.require_connection(out)? {
                let session = QuerySession::open(&mut self.registry, name, variant);
                writeln!(out, "Tables: {}", session.tables().join(", "))?;
                self.builder = Some(session);
            }
            return Ok(());
        }

        let Some(session) = self.builder.as_mut() else {
            writeln!(out, "Error: No query builder session (use :qb new)")?;
            return Ok(());
        };

        match command {
            BuilderCommand::New(_) => {}
            BuilderCommand::Table(table) => {
                session.select_main_table_from(&mut self.registry, table);
                writeln!(out, "Columns: {}", session.available_columns().join(", "))?;
            }
            BuilderCommand::Column(column) => session.toggle_column(&column, true),
            BuilderCommand::Uncolumn(column) => session.toggle_column(&column, false),
            BuilderCommand::Join {
                kind,
                table,
                condition,
            } => match kind {
                Some(kind) => session.add_typed_join(kind, &table, &condition),
                None => session.add_join(&table, &condition),
            },
            BuilderCommand::Where(condition) => session.add_condition(&condition),
            BuilderCommand::Show => writeln!(out, "{}", session.generate())?,
            BuilderCommand::Run => {
                let sql = session.generate();
                self.builder = None;
                writeln!(out, "{}", sql)?;
                self.run_sql(&sql, out)?;
            }
            BuilderCommand::Cancel => {
                self.builder = None;
                writeln!(out, "Query builder closed")?;
            }
        }
        Ok(())
    }

    fn run_sql<W: Write>(&mut self, sql: &str, out: &mut W) -> Result<()> {
        let Some(name) = self.require_connection(out)? else {
            return Ok(());
        };
        let result = self.registry.execute(sql, &name);
        self.show_result(result, out)?;
        if let Err(e) = self.history.record(sql) {
            writeln!(out, "Error: {}", e)?;
        }
        Ok(())
    }

    fn show_result<W: Write>(
        &mut self,
        result: std::result::Result<QueryResult, crate::core::ExecError>,
        out: &mut W,
    ) -> Result<()> {
        match result {
            Ok(result) => {
                if result.columns.is_empty() {
                    writeln!(out, "Statement executed")?;
                } else {
                    write!(out, "{}", ResultsGrid::from(result.clone()).render())?;
                    writeln!(out, "({} rows)", result.row_count)?;
                }
                self.last_result = Some(result);
            }
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
        Ok(())
    }

    fn transaction<W: Write>(
        &mut self,
        out: &mut W,
        success: &str,
        step: impl FnOnce(&mut ConnectionRegistry<C>, &str) -> bool,
    ) -> Result<()> {
        if let Some(name) = self.require_connection(out)? {
            if step(&mut self.registry, &name) {
                writeln!(out, "{}", success)?;
            } else {
                writeln!(out, "Error: {}", self.registry.last_error())?;
            }
        }
        Ok(())
    }

    fn print_tables<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let tables = self.registry.list_tables(name);
        if tables.is_empty() {
            writeln!(out, "(no tables)")?;
        }
        for table in tables {
            writeln!(out, "{}", table)?;
        }
        Ok(())
    }

    fn require_connection<W: Write>(&self, out: &mut W) -> Result<Option<String>> {
        if self.current.is_none() {
            writeln!(out, "Error: No connection selected")?;
        }
        Ok(self.current.clone())
    }
}

/// Runs the shell on standard input and output.
pub fn run_repl<C: Connector, S: HistoryStore>(shell: &mut Shell<C, S>) -> Result<()> {
    info!("Starting interactive shell");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    writeln!(stdout, "Welcome to dbdesk! Type :help for commands, :quit to exit.")?;
    shell.run(stdin.lock(), &mut stdout)
}
