//! SQL as a trait boundary (`Connection`), with one in-memory reference
//! driver so the test suite and demos have something to exercise it
//! against without a real database.

use std::collections::BTreeMap;
use std::sync::Mutex;

use monarch_core::Value;

#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("no table named '{0}'")]
    NoSuchTable(String),
    #[error("row {0} has no such column: {1}")]
    NoSuchColumn(usize, String),
}

/// One result row: a fixed column order with `Value` cells.
pub type Row = BTreeMap<String, Value>;

/// The driver boundary a real SQL crate (`rusqlite`, `postgres`, ...)
/// would implement. Deliberately synchronous and minimal — enough for a
/// collaborator module to issue a query and get rows back.
pub trait Connection: Send + Sync {
    fn execute(&self, statement: &str, params: &[Value]) -> Result<u64, SqlError>;
    fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, SqlError>;
}

/// A reference driver: tables are named in-memory vectors of rows, and
/// `statement` is only ever a table name — no SQL grammar is parsed. It
/// exists to give the test suite and demos a `Connection` to drive
/// without a real database, not to stand in for one.
#[derive(Default)]
pub struct InMemoryConnection {
    tables: Mutex<BTreeMap<String, Vec<Row>>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        InMemoryConnection::default()
    }

    pub fn create_table(&self, name: impl Into<String>) {
        self.tables.lock().unwrap().entry(name.into()).or_default();
    }

    pub fn insert(&self, table: &str, row: Row) -> Result<(), SqlError> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| SqlError::NoSuchTable(table.to_string()))?;
        rows.push(row);
        Ok(())
    }
}

impl Connection for InMemoryConnection {
    fn execute(&self, statement: &str, params: &[Value]) -> Result<u64, SqlError> {
        let mut row = BTreeMap::new();
        for (i, value) in params.iter().enumerate() {
            row.insert(format!("p{i}"), value.clone());
        }
        self.insert(statement, row)?;
        Ok(1)
    }

    fn query(&self, statement: &str, _params: &[Value]) -> Result<Vec<Row>, SqlError> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(statement)
            .cloned()
            .ok_or_else(|| SqlError::NoSuchTable(statement.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_then_query_round_trips() {
        let conn = InMemoryConnection::new();
        conn.create_table("events");
        conn.execute("events", &[Value::Str("net.http.request".into())])
            .unwrap();

        let rows = conn.query("events", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("p0"),
            Some(&Value::Str("net.http.request".into()))
        );
    }

    #[test]
    fn query_against_missing_table_errors() {
        let conn = InMemoryConnection::new();
        let err = conn.query("nope", &[]).unwrap_err();
        assert!(matches!(err, SqlError::NoSuchTable(_)));
    }
}
