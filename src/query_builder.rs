//! Point-and-click `SELECT` assembly.
//!
//! A `QuerySession` accumulates a main table, selected columns, optional
//! joins and raw filter fragments, and renders them into one SQL string.
//! Nothing is quoted or escaped: identifiers and literals are concatenated
//! exactly as the user typed them, so the output is only as safe as the
//! input.

use crate::core::db::{ConnectionRegistry, Connector};
use std::fmt;
use tracing::debug;

/// Join keywords offered by the extended builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub const ALL: [JoinKind; 3] = [JoinKind::Inner, JoinKind::Left, JoinKind::Right];

    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }

    /// Parses `inner`, `left` or `right`, case-insensitively
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "inner" => Some(JoinKind::Inner),
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            _ => None,
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One `<table> ON <condition>` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    /// Explicit join keyword; `None` means the keyword, if any, is part of `table`
    pub kind: Option<JoinKind>,
    pub table: String,
    pub condition: String,
}

impl JoinClause {
    fn render(&self) -> String {
        match self.kind {
            Some(kind) => format!(" {} {} ON {}", kind, self.table, self.condition),
            None => format!(" {} ON {}", self.table, self.condition),
        }
    }
}

/// Which builder configuration a session runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderVariant {
    /// Columns and `WHERE` conditions only; joins are ignored
    Minimal,
    /// Adds joins, either verbatim or with a typed `JoinKind`
    Extended,
}

/// In-progress state of one query-builder interaction
#[derive(Debug, Clone)]
pub struct QuerySession {
    connection: String,
    variant: BuilderVariant,
    tables: Vec<String>,
    main_table: String,
    available_columns: Vec<String>,
    columns: Vec<String>,
    joins: Vec<JoinClause>,
    conditions: Vec<String>,
}

impl QuerySession {
    /// An extended (join-capable) session targeting `connection`
    pub fn new(connection: impl Into<String>) -> Self {
        QuerySession::with_variant(connection, BuilderVariant::Extended)
    }

    /// A `WHERE`-only session targeting `connection`
    pub fn minimal(connection: impl Into<String>) -> Self {
        QuerySession::with_variant(connection, BuilderVariant::Minimal)
    }

    pub fn with_variant(connection: impl Into<String>, variant: BuilderVariant) -> Self {
        QuerySession {
            connection: connection.into(),
            variant,
            tables: Vec::new(),
            main_table: String::new(),
            available_columns: Vec::new(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Starts a session on `connection` with its table list already loaded
    pub fn open<C: Connector>(
        registry: &mut ConnectionRegistry<C>,
        connection: impl Into<String>,
        variant: BuilderVariant,
    ) -> Self {
        let mut session = QuerySession::with_variant(connection, variant);
        session.refresh_tables(registry);
        session
    }

    /// Reloads the tables offered for the main table and for joins
    pub fn refresh_tables<C: Connector>(&mut self, registry: &mut ConnectionRegistry<C>) {
        self.tables = registry.list_tables(&self.connection);
    }

    /// Sets the main table and clears the column selection
    pub fn select_main_table(&mut self, table: impl Into<String>) {
        self.main_table = table.into();
        self.columns.clear();
        self.available_columns.clear();
        debug!(table = %self.main_table, "Main table selected");
    }

    /// Sets the main table and repopulates the offered columns from the connection
    pub fn select_main_table_from<C: Connector>(
        &mut self,
        registry: &mut ConnectionRegistry<C>,
        table: impl Into<String>,
    ) {
        self.select_main_table(table);
        self.available_columns = registry.list_columns(&self.main_table, &self.connection);
    }

    /// Includes or excludes `column`. Inclusion appends to the end of the
    /// selection; exclusion of an unselected column changes nothing.
    pub fn toggle_column(&mut self, column: &str, included: bool) {
        let position = self.columns.iter().position(|c| c == column);
        match (included, position) {
            (true, None) => self.columns.push(column.to_string()),
            (false, Some(index)) => {
                self.columns.remove(index);
            }
            _ => {}
        }
    }

    /// Appends `<table> ON <condition>` verbatim. Ignored in the minimal
    /// variant and when either part is empty.
    pub fn add_join(&mut self, table: &str, condition: &str) {
        self.push_join(None, table, condition);
    }

    /// Appends `<KIND> <table> ON <condition>`
    pub fn add_typed_join(&mut self, kind: JoinKind, table: &str, condition: &str) {
        self.push_join(Some(kind), table, condition);
    }

    fn push_join(&mut self, kind: Option<JoinKind>, table: &str, condition: &str) {
        if self.variant == BuilderVariant::Minimal {
            debug!(table, "Join ignored by minimal builder");
            return;
        }
        if table.is_empty() || condition.is_empty() {
            return;
        }
        self.joins.push(JoinClause {
            kind,
            table: table.to_string(),
            condition: condition.to_string(),
        });
    }

    /// Appends a raw filter fragment; empty fragments are ignored
    pub fn add_condition(&mut self, condition: &str) {
        if condition.is_empty() {
            return;
        }
        self.conditions.push(condition.to_string());
    }

    /// Renders the current state. Repeated calls re-derive the string and
    /// never consume the session.
    pub fn generate(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.main_table);

        if self.variant == BuilderVariant::Extended {
            for join in &self.joins {
                sql.push_str(&join.render());
            }
        }

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn variant(&self) -> BuilderVariant {
        self.variant
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn main_table(&self) -> &str {
        &self.main_table
    }

    pub fn available_columns(&self) -> &[String] {
        &self.available_columns
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }
}
