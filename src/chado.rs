use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, Row as _, TypeInfo, ValueRef};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::ConnectionSettings;
use crate::error::ReportError;

/// A single scalar returned by chado.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One result row, owned and detached from the connection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Value, ReportError> {
        self.0.get(index).ok_or_else(|| ReportError::Column {
            index,
            message: format!("row has only {} columns", self.0.len()),
        })
    }

    pub fn int(&self, index: usize) -> Result<i64, ReportError> {
        match self.get(index)? {
            Value::Int(value) => Ok(*value),
            other => Err(mismatch(index, "int", other)),
        }
    }

    pub fn text(&self, index: usize) -> Result<&str, ReportError> {
        match self.get(index)? {
            Value::Text(value) => Ok(value),
            other => Err(mismatch(index, "text", other)),
        }
    }

    pub fn opt_text(&self, index: usize) -> Result<Option<&str>, ReportError> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value)),
            other => Err(mismatch(index, "text", other)),
        }
    }

    /// Renders any non-null scalar as text; used for columns whose SQL type
    /// differs between chado releases (e.g. strand).
    pub fn display(&self, index: usize) -> Result<String, ReportError> {
        Ok(match self.get(index)? {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Text(value) => value.clone(),
        })
    }
}

fn mismatch(index: usize, expected: &str, found: &Value) -> ReportError {
    ReportError::Column {
        index,
        message: format!("expected {expected}, found {}", found.kind()),
    }
}

/// Builds a [`Row`] from literals; handy for canned query results.
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::chado::Row::new(vec![$($crate::chado::Value::from($value)),*])
    };
}

pub trait ChadoClient {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, ReportError>;
}

/// Read-only chado connection. Queries run to completion on a private
/// current-thread runtime, so callers stay synchronous.
pub struct PgChadoClient {
    runtime: Runtime,
    connection: Option<PgConnection>,
    database: String,
}

impl PgChadoClient {
    pub fn connect(settings: &ConnectionSettings) -> Result<Self, ReportError> {
        let connect_error = |message: String| ReportError::Connect {
            server: settings.server.clone(),
            database: settings.database.clone(),
            message,
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| connect_error(err.to_string()))?;

        let mut options = PgConnectOptions::new()
            .host(&settings.server)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.username);
        if let Some(password) = &settings.password {
            options = options.password(password);
        }

        let connection = runtime
            .block_on(PgConnection::connect_with(&options))
            .map_err(|err| connect_error(err.to_string()))?;
        info!(
            server = %settings.server,
            database = %settings.database,
            "connected to chado"
        );

        Ok(Self {
            runtime,
            connection: Some(connection),
            database: settings.database.clone(),
        })
    }

    pub fn close(mut self) -> Result<(), ReportError> {
        if let Some(connection) = self.connection.take() {
            self.runtime
                .block_on(connection.close())
                .map_err(|err| ReportError::Query(err.to_string()))?;
            info!(database = %self.database, "closed chado connection");
        }
        Ok(())
    }
}

impl ChadoClient for PgChadoClient {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, ReportError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| ReportError::Query("connection already closed".to_string()))?;
        debug!(sql, "running query");
        let rows = self
            .runtime
            .block_on(sqlx::query(sql).fetch_all(&mut *connection))
            .map_err(|err| ReportError::Query(err.to_string()))?;
        rows.iter().map(decode_row).collect()
    }
}

impl Drop for PgChadoClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(err) = self.runtime.block_on(connection.close()) {
                warn!(database = %self.database, error = %err, "failed to close chado connection");
            }
        }
    }
}

fn decode_row(row: &PgRow) -> Result<Row, ReportError> {
    let column_error = |index: usize, err: sqlx::Error| ReportError::Column {
        index,
        message: err.to_string(),
    };
    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        let (is_null, type_name) = {
            let raw = row.try_get_raw(index).map_err(|err| column_error(index, err))?;
            (raw.is_null(), raw.type_info().name().to_string())
        };
        if is_null {
            values.push(Value::Null);
            continue;
        }
        let value = match type_name.as_str() {
            "INT2" => row.try_get::<i16, _>(index).map(|v| Value::Int(i64::from(v))),
            "INT4" => row.try_get::<i32, _>(index).map(|v| Value::Int(i64::from(v))),
            "INT8" => row.try_get::<i64, _>(index).map(Value::Int),
            "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::Float(f64::from(v))),
            "FLOAT8" => row.try_get::<f64, _>(index).map(Value::Float),
            "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool),
            _ => row.try_get::<String, _>(index).map(Value::Text),
        }
        .map_err(|err| column_error(index, err))?;
        values.push(value);
    }
    Ok(Row::new(values))
}
