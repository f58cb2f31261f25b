use tracing::debug;

use super::catalog::Capability;
use super::store::StatsStore;
use crate::models::tool::ToolCall;

/// Rows returned when the oracle omits `limit` for `get_sample_data`.
pub const DEFAULT_SAMPLE_LIMIT: i64 = 10;

/// Map one capability request onto the store and normalize the outcome into
/// a text payload. This never fails: unknown names, missing arguments,
/// rejected statements and store-level errors all come back as descriptive
/// strings the oracle can read and react to on its next turn.
pub async fn dispatch(store: &dyn StatsStore, call: &ToolCall) -> String {
    let Some(capability) = Capability::from_name(&call.name) else {
        return format!("Error: no capability named '{}' exists.", call.name);
    };

    debug!(capability = capability.name(), "dispatching capability");

    match capability {
        Capability::ListTables => match store.list_tables().await {
            Ok(tables) if tables.is_empty() => "No tables found.".to_string(),
            Ok(tables) => tables.join("\n"),
            Err(e) => format!("Error listing tables: {}", e),
        },
        Capability::GetTableSchema => {
            let table_name = match str_arg(call, "table_name") {
                Ok(value) => value,
                Err(message) => return message,
            };
            match store.table_schema(table_name).await {
                Ok(columns) if columns.is_empty() => {
                    format!("No columns found for table '{}'.", table_name)
                }
                Ok(columns) => columns
                    .iter()
                    .map(|c| format!("{}: {}", c.name, c.data_type))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => format!("Error fetching schema for '{}': {}", table_name, e),
            }
        }
        Capability::GetSampleData => {
            let table_name = match str_arg(call, "table_name") {
                Ok(value) => value,
                Err(message) => return message,
            };
            let limit = call
                .arguments
                .get("limit")
                .and_then(|v| v.as_i64())
                .unwrap_or(DEFAULT_SAMPLE_LIMIT);
            match store.sample_rows(table_name, limit).await {
                Ok(rows) => rows,
                Err(e) => format!("Error sampling '{}': {}", table_name, e),
            }
        }
        Capability::RunQuery => {
            let sql_query = match str_arg(call, "sql_query") {
                Ok(value) => value,
                Err(message) => return message,
            };
            if !is_read_only(sql_query) {
                return "Error: Only SELECT queries are allowed.".to_string();
            }
            match store.run_query(sql_query).await {
                Ok(rows) => rows,
                Err(e) => format!("Error executing query: {}", e),
            }
        }
    }
}

/// The syntactic read-only gate: trimmed statement must start with SELECT,
/// case-insensitive. Runs before the store ever sees the statement.
fn is_read_only(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("select"))
}

fn str_arg<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, String> {
    call.arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            format!(
                "Error: missing required string argument '{}' for capability '{}'.",
                key, call.name
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::store::Column;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory fake with a call counter on the query path, so tests can
    /// prove the gate keeps rejected statements away from the store.
    #[derive(Default)]
    struct FakeStore {
        queries_executed: AtomicU32,
        fail_queries: bool,
    }

    #[async_trait]
    impl StatsStore for FakeStore {
        async fn list_tables(&self) -> Result<Vec<String>> {
            Ok(vec![
                "matches".to_string(),
                "players".to_string(),
                "teams".to_string(),
            ])
        }

        async fn table_schema(&self, table_name: &str) -> Result<Vec<Column>> {
            match table_name {
                "players" => Ok(vec![
                    Column {
                        name: "player_id".to_string(),
                        data_type: "integer".to_string(),
                    },
                    Column {
                        name: "full_name".to_string(),
                        data_type: "text".to_string(),
                    },
                ]),
                _ => Err(anyhow!("relation \"{}\" does not exist", table_name)),
            }
        }

        async fn sample_rows(&self, table_name: &str, limit: i64) -> Result<String> {
            Ok(format!("{} rows from {}", limit, table_name))
        }

        async fn run_query(&self, _sql_query: &str) -> Result<String> {
            self.queries_executed.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries {
                Err(anyhow!("syntax error at or near \"FORM\""))
            } else {
                Ok(r#"[{"count": 50}]"#.to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_list_tables() {
        let store = FakeStore::default();
        let call = ToolCall::new("list_tables", json!({}));
        assert_eq!(dispatch(&store, &call).await, "matches\nplayers\nteams");
    }

    #[tokio::test]
    async fn test_dispatch_table_schema() {
        let store = FakeStore::default();
        let call = ToolCall::new("get_table_schema", json!({"table_name": "players"}));
        assert_eq!(
            dispatch(&store, &call).await,
            "player_id: integer\nfull_name: text"
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_table_is_payload_not_panic() {
        let store = FakeStore::default();
        let call = ToolCall::new("get_table_schema", json!({"table_name": "stadiums"}));
        let payload = dispatch(&store, &call).await;
        assert!(payload.contains("does not exist"));
        assert!(payload.starts_with("Error"));
    }

    #[tokio::test]
    async fn test_dispatch_missing_argument() {
        let store = FakeStore::default();
        let call = ToolCall::new("get_table_schema", json!({}));
        let payload = dispatch(&store, &call).await;
        assert!(payload.contains("missing required string argument 'table_name'"));
    }

    #[tokio::test]
    async fn test_dispatch_sample_data_default_limit() {
        let store = FakeStore::default();
        let call = ToolCall::new("get_sample_data", json!({"table_name": "matches"}));
        assert_eq!(dispatch(&store, &call).await, "10 rows from matches");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_capability() {
        let store = FakeStore::default();
        let call = ToolCall::new("drop_table", json!({"table_name": "players"}));
        assert_eq!(
            dispatch(&store, &call).await,
            "Error: no capability named 'drop_table' exists."
        );
        assert_eq!(store.queries_executed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_non_select() {
        let store = FakeStore::default();
        for sql in [
            "DELETE FROM players",
            "  drop table matches",
            "UPDATE teams SET name = 'x'",
            "SELEC * FROM players",
        ] {
            let call = ToolCall::new("run_query", json!({"sql_query": sql}));
            assert_eq!(
                dispatch(&store, &call).await,
                "Error: Only SELECT queries are allowed."
            );
        }
        // The store was never reached
        assert_eq!(store.queries_executed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_select_case_and_whitespace() {
        let store = FakeStore::default();
        for sql in [
            "SELECT COUNT(*) FROM centuries WHERE player='Kohli'",
            "  select * from matches",
            "\n\tSeLeCt 1",
        ] {
            let call = ToolCall::new("run_query", json!({"sql_query": sql}));
            assert_eq!(dispatch(&store, &call).await, r#"[{"count": 50}]"#);
        }
        assert_eq!(store.queries_executed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dispatch_query_failure_becomes_payload() {
        let store = FakeStore {
            fail_queries: true,
            ..Default::default()
        };
        let call = ToolCall::new("run_query", json!({"sql_query": "SELECT * FORM matches"}));
        let payload = dispatch(&store, &call).await;
        assert!(payload.starts_with("Error executing query:"));
        assert!(payload.contains("FORM"));
    }

    #[test]
    fn test_is_read_only_edge_cases() {
        assert!(is_read_only("SELECT 1"));
        assert!(is_read_only("   select 1"));
        assert!(!is_read_only("SEL"));
        assert!(!is_read_only(""));
        // The gate is a prefix check only
        assert!(is_read_only("select_now()"));
    }
}
