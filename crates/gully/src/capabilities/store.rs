use anyhow::Result;
use async_trait::async_trait;

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

/// The database collaborator behind the capability set. Passed explicitly
/// into the agent at construction so runs stay isolated and testable with
/// fakes. Failures here are ordinary `Result`s; dispatch renders them into
/// text payloads before they reach the transcript.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Names of all queryable tables
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns of one table, in declaration order
    async fn table_schema(&self, table_name: &str) -> Result<Vec<Column>>;

    /// Textual rendering of up to `limit` rows of a table
    async fn sample_rows(&self, table_name: &str, limit: i64) -> Result<String>;

    /// Execute a SELECT statement and render the result rows as text.
    /// The read-only gate runs before this is invoked; implementations may
    /// assume the statement starts with SELECT.
    async fn run_query(&self, sql_query: &str) -> Result<String>;
}
