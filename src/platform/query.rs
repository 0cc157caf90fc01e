//! Query builder
//!
//! Name- and path-based lookups go through the service's SQL-like query
//! endpoint. Predicates are collected as structured equality clauses and only
//! rendered to a script at the end, with string values escaped, so a name
//! containing a quote cannot change the shape of the query.

use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use serde_json::{json, Map, Value};
use std::fmt;

/// Query endpoint
pub const QUERY_API: &str = "/RedRock/query";

/// Default `Args` sent with every query
pub fn default_args() -> Value {
    json!({ "Caching": -1 })
}

/// Right-hand side of an equality clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    Bool(bool),
}

/// `SELECT * FROM <table> WHERE 1=1 [AND <column>=<value>]*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    clauses: Vec<(String, Operand)>,
}

impl Query {
    pub fn select(table: &str) -> Self {
        Self {
            table: table.to_string(),
            clauses: Vec::new(),
        }
    }

    /// Add `column='value'`
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.clauses
            .push((column.to_string(), Operand::Text(value.to_string())));
        self
    }

    /// Add `column='value'` only when `value` is non-empty
    pub fn eq_if_set(self, column: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.eq(column, value)
        }
    }

    /// Add `column=true|false`
    pub fn is(mut self, column: &str, value: bool) -> Self {
        self.clauses.push((column.to_string(), Operand::Bool(value)));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn clauses(&self) -> &[(String, Operand)] {
        &self.clauses
    }

    /// Render the query script
    pub fn to_script(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT * FROM {} WHERE 1=1", self.table)?;
        for (column, operand) in &self.clauses {
            match operand {
                Operand::Text(value) => write!(f, " AND {}='{}'", column, escape(value))?,
                Operand::Bool(value) => write!(f, " AND {}={}", column, value)?,
            }
        }
        Ok(())
    }
}

/// Escape a string literal by doubling single quotes
pub fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Run a query and return every row
pub async fn run_query(
    client: &VaultClient,
    query: &Query,
    args: Option<Value>,
) -> Result<Vec<Map<String, Value>>> {
    let body = json!({
        "Script": query.to_script(),
        "Args": args.unwrap_or_else(default_args),
    });
    tracing::debug!("Query arguments: {}", body);

    let result = client.call_map(QUERY_API, &body).await?;
    extract_rows(&result)
}

/// Run a query that must match exactly one row
///
/// Uniqueness of name-based lookups is a guarantee of the remote service;
/// zero rows and several rows are reported as distinct errors.
pub async fn query_single(client: &VaultClient, query: &Query) -> Result<Map<String, Value>> {
    let mut rows = run_query(client, query, None).await?;

    match rows.len() {
        0 => {
            tracing::error!("Query returns 0 object: {}", query);
            Err(VaultError::NotFound)
        }
        1 => Ok(rows.remove(0)),
        n => {
            tracing::error!("Query returns too many objects (found {}, expected 1): {}", n, query);
            Err(VaultError::TooMany(n))
        }
    }
}

/// Pull `Results[*].Row` out of a query result
fn extract_rows(result: &Map<String, Value>) -> Result<Vec<Map<String, Value>>> {
    let Some(results) = result.get("Results") else {
        return Ok(Vec::new());
    };
    let Value::Array(results) = results else {
        return Err(shape_error("Results is not an array"));
    };

    results
        .iter()
        .map(|entry| match entry.get("Row") {
            Some(Value::Object(row)) => Ok(row.clone()),
            _ => Err(shape_error("result entry without Row object")),
        })
        .collect()
}

fn shape_error(message: &str) -> VaultError {
    VaultError::Result {
        method: QUERY_API.to_string(),
        message: message.to_string(),
    }
}
