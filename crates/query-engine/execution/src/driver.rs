//! The capabilities a database driver has to provide.
//!
//! A [`Driver`] opens a [`Connection`], the connection prepares a [`Statement`] once, and
//! every execution of that statement yields a fresh [`Cursor`]. Cursors borrow their
//! statement, and statements borrow their connection, so a cursor cannot outlive the
//! execution that produced it.

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Error;

/// User name and password used to open a connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// A pluggable adapter for one database protocol.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The canonical name of the driver.
    fn name(&self) -> &str;

    /// Open a single connection. The connection stays open until [`Connection::close`].
    async fn connect(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, Error>;
}

/// A live session to the database.
#[async_trait]
pub trait Connection: Send {
    /// Prepare `sql` once and bind `parameters` positionally. A `None` parameter binds
    /// `NULL`. `fetch_size` is a batching hint and never changes which rows are returned.
    async fn prepare<'c>(
        &'c mut self,
        sql: &str,
        fetch_size: Option<u32>,
        parameters: &[Option<String>],
    ) -> Result<Box<dyn Statement + 'c>, Error>;

    /// Release the session.
    async fn close(self: Box<Self>) -> Result<(), Error>;
}

/// A prepared, parameterized statement.
#[async_trait]
pub trait Statement: Send {
    /// The statement text as it was prepared.
    fn sql(&self) -> &str;

    /// Run the statement again, without re-preparing or re-binding it.
    async fn execute<'s>(&'s mut self) -> Result<Box<dyn Cursor + 's>, Error>;
}

/// A forward-only, non-restartable result cursor.
#[async_trait]
pub trait Cursor: Send {
    /// Read the next row and materialize it.
    async fn next_row(&mut self) -> Result<Option<Row>, Error>;

    /// Read the next row and discard it. Returns `false` once the cursor is exhausted.
    async fn skip_row(&mut self) -> Result<bool, Error>;

    /// Drain whatever is left unread and release the cursor.
    async fn close(self: Box<Self>) -> Result<(), Error>;
}

/// One column of a result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: serde_json::Value,
}

/// A result row. Fields keep the column order of the result set, and duplicated column
/// names are preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub fields: Vec<Field>,
}

impl Row {
    pub fn new(fields: Vec<Field>) -> Self {
        Row { fields }
    }

    /// Look a value up by column name. The first matching column wins.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// Look a value up by zero-based column position.
    pub fn get_index(&self, index: usize) -> Option<&serde_json::Value> {
        self.fields.get(index).map(|field| &field.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, serde_json::Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, serde_json::Value)>>(iter: I) -> Self {
        Row::new(
            iter.into_iter()
                .map(|(name, value)| Field {
                    name: name.into(),
                    value,
                })
                .collect(),
        )
    }
}

/// Rows serialize as JSON objects in column order.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{rendered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_keep_column_order_and_duplicates() {
        let row: Row = [("id", json!(1)), ("name", json!("a")), ("id", json!(2))]
            .into_iter()
            .collect();

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("id"), Some(&json!(1)));
        assert_eq!(row.get_index(2), Some(&json!(2)));
        assert_eq!(row.to_string(), r#"{"id":1,"name":"a","id":2}"#);
    }

    #[test]
    fn credentials_debug_hides_the_password() {
        let credentials = Credentials {
            username: "scott".to_string(),
            password: Some("tiger".to_string()),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("scott"));
        assert!(!rendered.contains("tiger"));
    }
}
