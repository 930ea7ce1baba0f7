//! Database handle for a chat session.
//!
//! `SqlDatabase` is the two capabilities the chat chain needs: describe the
//! schema as text, and run a SQL string returning its result as text. The
//! MySQL implementation sends statements over the text protocol exactly as
//! the model wrote them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Row, TypeInfo, ValueRef};

use crate::config::DatabaseConfig;
use crate::error::SqlChatError;
use crate::models::ConnectionSettings;

/// Longest sample value shown in a schema description.
const SAMPLE_VALUE_MAX_CHARS: usize = 100;

#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// DDL plus sample rows for every table, as one block of text.
    async fn table_info(&self) -> Result<String, SqlChatError>;

    /// Execute `sql` verbatim. Rows come back as `[('a', 1), ...]`; a
    /// statement without rows yields an empty string.
    async fn run(&self, sql: &str) -> Result<String, SqlChatError>;

    /// Server version string, used as a liveness check.
    async fn server_version(&self) -> Result<String, SqlChatError>;
}

/// Opens a database handle from connection settings.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn SqlDatabase>, SqlChatError>;
}

pub struct MySqlConnector {
    config: DatabaseConfig,
}

impl MySqlConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DatabaseConnector for MySqlConnector {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn SqlDatabase>, SqlChatError> {
        let db = MySqlDatabase::connect(settings, &self.config).await?;
        Ok(Arc::new(db))
    }
}

pub struct MySqlDatabase {
    pool: MySqlPool,
    sample_rows: u32,
}

impl MySqlDatabase {
    pub async fn connect(
        settings: &ConnectionSettings,
        config: &DatabaseConfig,
    ) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&settings.connection_string())
            .await?;

        tracing::info!(database = %settings.redacted(), "Connected to database");

        Ok(Self::from_pool(pool, config.sample_rows))
    }

    pub fn from_pool(pool: MySqlPool, sample_rows: u32) -> Self {
        Self { pool, sample_rows }
    }

    /// Base tables of the current database, sorted by name.
    pub async fn table_names(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows = self
            .fetch(
                "SELECT TABLE_NAME FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
                 ORDER BY TABLE_NAME",
            )
            .await?;

        rows.iter()
            .map(|row| decode_cell(row, 0).map(|c| c.plain()))
            .collect()
    }

    async fn describe_table(&self, table: &str) -> Result<String, sqlx::Error> {
        let ident = quote_ident(table);

        let create = self.fetch(&format!("SHOW CREATE TABLE {}", ident)).await?;
        let ddl = match create.first() {
            Some(row) => decode_cell(row, 1)?.plain(),
            None => return Err(sqlx::Error::RowNotFound),
        };

        let samples = self
            .fetch(&format!("SELECT * FROM {} LIMIT {}", ident, self.sample_rows))
            .await?;

        let columns = self.column_names(table).await?;

        let mut lines = Vec::with_capacity(samples.len() + 1);
        lines.push(columns.join("\t"));
        for row in &samples {
            let mut values = Vec::with_capacity(row.len());
            for idx in 0..row.len() {
                let value = decode_cell(row, idx)?.plain();
                values.push(value.chars().take(SAMPLE_VALUE_MAX_CHARS).collect::<String>());
            }
            lines.push(values.join("\t"));
        }

        Ok(format!(
            "{}\n\n/*\n{} rows from {} table:\n{}\n*/",
            ddl.trim_end(),
            self.sample_rows,
            table,
            lines.join("\n")
        ))
    }

    /// Column names in declaration order, also for tables without rows.
    async fn column_names(&self, table: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows = self
            .fetch(&format!(
                "SELECT COLUMN_NAME FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {} \
                 ORDER BY ORDINAL_POSITION",
                quote_literal(table)
            ))
            .await?;

        rows.iter()
            .map(|row| decode_cell(row, 0).map(|c| c.plain()))
            .collect()
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<MySqlRow>, sqlx::Error> {
        sqlx::raw_sql(sql).fetch_all(&self.pool).await
    }
}

#[async_trait]
impl SqlDatabase for MySqlDatabase {
    async fn table_info(&self) -> Result<String, SqlChatError> {
        let tables = self.table_names().await?;

        let mut sections = Vec::with_capacity(tables.len());
        for table in &tables {
            sections.push(self.describe_table(table).await?);
        }

        Ok(sections.join("\n\n"))
    }

    async fn run(&self, sql: &str) -> Result<String, SqlChatError> {
        tracing::debug!(sql = %sql, "Executing generated query");
        let rows = self.fetch(sql).await?;

        let mut tuples = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(row.len());
            for idx in 0..row.len() {
                cells.push(decode_cell(row, idx)?);
            }
            tuples.push(cells);
        }

        Ok(format_rows(&tuples))
    }

    async fn server_version(&self) -> Result<String, SqlChatError> {
        let rows = self.fetch("SELECT VERSION()").await?;
        let row = rows.first().ok_or(sqlx::Error::RowNotFound)?;
        Ok(decode_cell(row, 0)?.plain())
    }
}

// ============================================================================
// Value rendering
// ============================================================================

/// A decoded result value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(String),
    Text(String),
}

impl Cell {
    /// Literal form used inside result tuples.
    pub fn literal(&self) -> String {
        match self {
            Cell::Null => "None".to_string(),
            Cell::Number(n) => n.clone(),
            Cell::Text(s) => python_str_repr(s),
        }
    }

    /// Bare form used in schema samples.
    pub fn plain(&self) -> String {
        match self {
            Cell::Null => "None".to_string(),
            Cell::Number(s) | Cell::Text(s) => s.clone(),
        }
    }
}

/// `[('A', 2), ('B', 1)]`; one-element tuples keep the trailing comma. No
/// rows render as an empty string.
pub fn format_rows(rows: &[Vec<Cell>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let tuples: Vec<String> = rows
        .iter()
        .map(|cells| {
            let values: Vec<String> = cells.iter().map(Cell::literal).collect();
            if values.len() == 1 {
                format!("({},)", values[0])
            } else {
                format!("({})", values.join(", "))
            }
        })
        .collect();

    format!("[{}]", tuples.join(", "))
}

fn decode_cell(row: &MySqlRow, idx: usize) -> Result<Cell, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Cell::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    if type_name.ends_with("UNSIGNED") {
        return Ok(Cell::Number(row.try_get_unchecked::<u64, _>(idx)?.to_string()));
    }

    match type_name.as_str() {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Ok(Cell::Number(row.try_get_unchecked::<i64, _>(idx)?.to_string()))
        }
        "FLOAT" | "DOUBLE" => Ok(Cell::Number(float_repr(row.try_get_unchecked::<f64, _>(idx)?))),
        "DECIMAL" => Ok(Cell::Number(text_value(row, idx)?)),
        _ => Ok(Cell::Text(text_value(row, idx)?)),
    }
}

/// Quoted the way Python prints a `str`: single quotes unless the text holds
/// a single quote and no double quote.
fn python_str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Python float repr: `2.0`, `0.1`, `1e+16`, `inf`, `nan`.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Debug already switches to exponent form at the same magnitudes
    let debug = format!("{:?}", value);
    match debug.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => debug,
    }
}

fn text_value(row: &MySqlRow, idx: usize) -> Result<String, sqlx::Error> {
    match row.try_get_unchecked::<String, _>(idx) {
        Ok(s) => Ok(s),
        Err(_) => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
