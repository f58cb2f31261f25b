use serde_json::{json, Value};

use crate::models::tool::Tool;

/// The closed set of capabilities the oracle may request. Adding or removing
/// one is a compile-time change: every site that dispatches or declares
/// capabilities matches exhaustively on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ListTables,
    GetTableSchema,
    GetSampleData,
    RunQuery,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ListTables,
        Capability::GetTableSchema,
        Capability::GetSampleData,
        Capability::RunQuery,
    ];

    /// The name the oracle requests this capability by
    pub fn name(self) -> &'static str {
        match self {
            Capability::ListTables => "list_tables",
            Capability::GetTableSchema => "get_table_schema",
            Capability::GetSampleData => "get_sample_data",
            Capability::RunQuery => "run_query",
        }
    }

    /// Resolve an oracle-supplied name, `None` if no capability matches
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            Capability::ListTables => "List all tables in the cricket statistics database.",
            Capability::GetTableSchema => {
                "Get the columns and data types of one table. Use this before writing SQL \
                 against a table you have not inspected yet."
            }
            Capability::GetSampleData => {
                "Get a sample of rows from a table to see actual data values, e.g. how player \
                 or team names are spelled."
            }
            Capability::RunQuery => {
                "Execute a SQL query against the database and return the result rows. Only \
                 SELECT queries are allowed."
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Capability::ListTables => json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            Capability::GetTableSchema => json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "The table to describe"
                    }
                },
                "required": ["table_name"]
            }),
            Capability::GetSampleData => json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "The table to sample"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of rows to return (default 10)"
                    }
                },
                "required": ["table_name"]
            }),
            Capability::RunQuery => json!({
                "type": "object",
                "properties": {
                    "sql_query": {
                        "type": "string",
                        "description": "The SQL SELECT query to execute"
                    }
                },
                "required": ["sql_query"]
            }),
        }
    }

    /// Tool declarations for the whole set, passed to the oracle each turn
    pub fn declarations() -> Vec<Tool> {
        Self::ALL
            .into_iter()
            .map(|c| Tool::new(c.name(), c.description(), c.input_schema()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_name_roundtrip() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_name(capability.name()), Some(capability));
        }
    }

    #[test]
    fn test_from_name_unknown() {
        assert_eq!(Capability::from_name("drop_table"), None);
        assert_eq!(Capability::from_name(""), None);
    }

    #[test]
    fn test_declarations_are_complete_and_unique() {
        let declarations = Capability::declarations();
        assert_eq!(declarations.len(), Capability::ALL.len());

        let names: HashSet<_> = declarations.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), declarations.len());

        for tool in &declarations {
            assert!(tool.input_schema.is_object());
            assert!(!tool.description.is_empty());
        }
    }

    #[test]
    fn test_run_query_schema_requires_sql() {
        let declarations = Capability::declarations();
        let run_query = declarations
            .iter()
            .find(|t| t.name == "run_query")
            .unwrap();
        assert_eq!(run_query.input_schema["required"][0], "sql_query");
    }
}
