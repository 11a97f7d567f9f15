//! Property-based tests for the query builder and the query history
//!
//! These tests check that:
//! - Generated SQL always follows the `SELECT .. FROM .. [WHERE ..]` shape
//! - Column selection keeps first-inclusion order
//! - The history stays distinct and capped

use dbdesk::query_builder::QuerySession;
use dbdesk::repl::{parse_command, Command};
use dbdesk::storage::{MemoryHistoryStore, QueryHistory, HISTORY_LIMIT};
use proptest::prelude::*;

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn arb_condition() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (arb_identifier(), 0i64..1000).prop_map(|(c, v)| format!("{} > {}", c, v)),
    ]
}

proptest! {
    #[test]
    fn test_generated_sql_shape(
        table in arb_identifier(),
        columns in prop::collection::vec(arb_identifier(), 0..6),
        conditions in prop::collection::vec(arb_condition(), 0..6),
    ) {
        let mut session = QuerySession::new("main");
        session.select_main_table(table.clone());
        for column in &columns {
            session.toggle_column(column, true);
        }
        for condition in &conditions {
            session.add_condition(condition);
        }

        let mut distinct: Vec<&String> = Vec::new();
        for column in &columns {
            if !distinct.contains(&column) {
                distinct.push(column);
            }
        }
        let projection = if distinct.is_empty() {
            "*".to_string()
        } else {
            distinct.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
        };
        let kept: Vec<&str> = conditions
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .collect();

        let mut expected = format!("SELECT {} FROM {}", projection, table);
        if !kept.is_empty() {
            expected.push_str(" WHERE ");
            expected.push_str(&kept.join(" AND "));
        }
        prop_assert_eq!(session.generate(), expected);
        prop_assert_eq!(session.conditions().len(), kept.len());
    }

    #[test]
    fn test_excluded_column_never_selected(
        columns in prop::collection::vec(arb_identifier(), 1..8),
        victim in 0usize..8,
    ) {
        let mut session = QuerySession::new("main");
        session.select_main_table("t");
        for column in &columns {
            session.toggle_column(column, true);
        }
        let victim = &columns[victim % columns.len()];
        session.toggle_column(victim, false);
        prop_assert!(!session.columns().contains(victim));

        session.toggle_column(victim, true);
        prop_assert_eq!(session.columns().last(), Some(victim));
    }

    #[test]
    fn test_history_is_distinct_and_capped(
        queries in prop::collection::vec("SELECT [0-9]{1,3}", 0..120),
    ) {
        let mut history = QueryHistory::load(MemoryHistoryStore::new()).unwrap();
        for query in &queries {
            history.record(query).unwrap();
        }

        let entries = history.entries();
        prop_assert!(entries.len() <= HISTORY_LIMIT);
        for (i, entry) in entries.iter().enumerate() {
            prop_assert!(!entries[i + 1..].contains(entry));
        }
        if let Some(last) = queries.last() {
            prop_assert!(entries.contains(last));
        }
    }

    #[test]
    fn test_plain_input_is_sql(sql in "[A-Za-z][A-Za-z0-9 *=,]{0,40}") {
        prop_assert_eq!(parse_command(&sql), Command::Sql(sql.trim().to_string()));
    }
}
