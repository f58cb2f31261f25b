use anyhow::{anyhow, Result};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use regex::Regex;
use serde_json::{json, Map, Value};
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};

use super::store::{Column, StatsStore};

/// PostgreSQL connection parameters, read from the POSTGRES_* environment
/// variables.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "cricket".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            pool_size: 4,
        }
    }
}

impl PgConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("POSTGRES_HOST").unwrap_or(defaults.host),
            port: std::env::var("POSTGRES_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("POSTGRES_DB").unwrap_or(defaults.dbname),
            user: std::env::var("POSTGRES_USER").unwrap_or(defaults.user),
            password: std::env::var("POSTGRES_PASSWORD").unwrap_or(defaults.password),
            pool_size: std::env::var("POSTGRES_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
        }
    }

    pub fn create_pool(&self) -> Result<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| anyhow!("Failed to create pool: {}", e))?;

        Ok(pool)
    }
}

/// The Postgres-backed capability provider.
pub struct PgStatsStore {
    pool: Pool,
}

impl PgStatsStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn connect(config: &PgConfig) -> Result<Self> {
        Ok(Self::new(config.create_pool()?))
    }
}

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'public' ORDER BY table_name",
                &[],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn table_schema(&self, table_name: &str) -> Result<Vec<Column>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_name = $1 ORDER BY ordinal_position",
                &[&table_name],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| Column {
                name: row.get(0),
                data_type: row.get(1),
            })
            .collect())
    }

    async fn sample_rows(&self, table_name: &str, limit: i64) -> Result<String> {
        // Table names cannot be bound as statement parameters, so the
        // identifier is validated before interpolation.
        if !valid_identifier(table_name) {
            return Err(anyhow!("invalid table name: '{}'", table_name));
        }
        let client = self.pool.get().await?;
        let statement = format!("SELECT * FROM {} LIMIT $1", table_name);
        let rows = client.query(statement.as_str(), &[&limit.max(1)]).await?;
        Ok(render_rows(&rows))
    }

    async fn run_query(&self, sql_query: &str) -> Result<String> {
        let client = self.pool.get().await?;
        let rows = client.query(sql_query, &[]).await?;
        Ok(render_rows(&rows))
    }
}

/// Render result rows as one JSON object per row, keyed by column name.
/// The oracle reads this as text; keeping it line-per-row keeps transcripts
/// legible for wide results.
fn render_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "No results found.".to_string();
    }

    rows.iter()
        .map(|row| {
            let mut object = Map::new();
            for (idx, column) in row.columns().iter().enumerate() {
                object.insert(column.name().to_string(), cell_to_json(row, idx));
            }
            Value::Object(object).to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_to_json(row: &Row, idx: usize) -> Value {
    let column_type = row.columns()[idx].type_();
    if *column_type == Type::BOOL {
        opt_json(row.try_get::<_, Option<bool>>(idx))
    } else if *column_type == Type::INT2 {
        opt_json(row.try_get::<_, Option<i16>>(idx))
    } else if *column_type == Type::INT4 {
        opt_json(row.try_get::<_, Option<i32>>(idx))
    } else if *column_type == Type::INT8 {
        opt_json(row.try_get::<_, Option<i64>>(idx))
    } else if *column_type == Type::FLOAT4 {
        opt_json(row.try_get::<_, Option<f32>>(idx))
    } else if *column_type == Type::FLOAT8 {
        opt_json(row.try_get::<_, Option<f64>>(idx))
    } else if *column_type == Type::TEXT
        || *column_type == Type::VARCHAR
        || *column_type == Type::BPCHAR
        || *column_type == Type::NAME
    {
        opt_json(row.try_get::<_, Option<String>>(idx))
    } else if *column_type == Type::DATE {
        match row.try_get::<_, Option<chrono::NaiveDate>>(idx) {
            Ok(Some(date)) => json!(date.to_string()),
            _ => Value::Null,
        }
    } else if *column_type == Type::TIMESTAMP {
        match row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
            Ok(Some(ts)) => json!(ts.to_string()),
            _ => Value::Null,
        }
    } else if *column_type == Type::TIMESTAMPTZ {
        match row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx) {
            Ok(Some(ts)) => json!(ts.to_rfc3339()),
            _ => Value::Null,
        }
    } else if *column_type == Type::JSON || *column_type == Type::JSONB {
        opt_json(row.try_get::<_, Option<Value>>(idx))
    } else {
        // NUMERIC and anything else without a native mapping: surface the
        // type name so the oracle can re-query with an explicit cast
        json!(format!("<unsupported type: {}>", column_type.name()))
    }
}

fn opt_json<T: Into<Value>>(value: Result<Option<T>, tokio_postgres::Error>) -> Value {
    match value {
        Ok(Some(inner)) => inner.into(),
        _ => Value::Null,
    }
}

fn valid_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    re.is_match(name)
}
