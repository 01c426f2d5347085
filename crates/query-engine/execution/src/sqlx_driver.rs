//! Built-in drivers on the native sqlx connections.
//!
//! Postgres reports the type of every placeholder when a statement is prepared, and
//! parameter values are converted to those types before they are bound. MySQL and SQLite
//! only report how many placeholders there are, so their parameters are bound as text and
//! coerced by the database.

use std::collections::VecDeque;

use async_trait::async_trait;
use enum_iterator::Sequence;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::database::{HasArguments, HasStatement};
use sqlx::IntoArguments;
use sqlx::{Column as _, Either, Executor, MySql, Postgres, Row as _, Sqlite, TypeInfo as _};
use tracing::{debug, info_span, warn, Instrument};

use crate::backend::Backend;
use crate::connection_url;
use crate::driver::{Connection, Credentials, Cursor, Driver, Field, Row, Statement};
use crate::error::Error;
use crate::parameters::{self, Parameter};

/// The database backends linked into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum DriverKind {
    Postgres,
    MySql,
    Sqlite,
}

impl DriverKind {
    /// The canonical identifier, which is also the first of [`DriverKind::identifiers`].
    pub fn name(self) -> &'static str {
        self.identifiers()[0]
    }

    /// Every identifier the driver is registered under, including JDBC class names.
    pub fn identifiers(self) -> &'static [&'static str] {
        match self {
            DriverKind::Postgres => &["postgres", "postgresql", "org.postgresql.Driver"],
            DriverKind::MySql => &[
                "mysql",
                "mariadb",
                "com.mysql.cj.jdbc.Driver",
                "com.mysql.jdbc.Driver",
                "org.mariadb.jdbc.Driver",
            ],
            DriverKind::Sqlite => &["sqlite", "org.sqlite.JDBC"],
        }
    }

    /// URL schemes the driver accepts.
    pub fn schemes(self) -> &'static [&'static str] {
        match self {
            DriverKind::Postgres => &["postgres", "postgresql"],
            DriverKind::MySql => &["mysql", "mariadb"],
            DriverKind::Sqlite => &["sqlite"],
        }
    }

    fn uses_credentials(self) -> bool {
        !matches!(self, DriverKind::Sqlite)
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A driver for one of the backends sqlx supports.
#[derive(Debug)]
pub struct SqlxDriver {
    kind: DriverKind,
}

impl SqlxDriver {
    pub fn new(kind: DriverKind) -> Self {
        SqlxDriver { kind }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }
}

#[async_trait]
impl Driver for SqlxDriver {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn connect(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, Error> {
        let url = connection_url::normalize(url);
        let redacted_url = connection_url::redact(url);

        match connection_url::scheme(url) {
            Some(scheme) if self.kind.schemes().contains(&scheme.as_str()) => {}
            Some(scheme) => {
                return Err(Error::connection(
                    redacted_url,
                    format!("the {} driver does not handle '{scheme}' URLs", self.kind),
                ))
            }
            None => {
                return Err(Error::connection(
                    redacted_url,
                    "the connection URL has no scheme",
                ))
            }
        }

        let url = match credentials {
            Some(credentials) if self.kind.uses_credentials() => {
                connection_url::with_credentials(url, credentials)
                    .map_err(|err| Error::connection(redacted_url.clone(), err))?
            }
            Some(_) => {
                warn!(driver = %self.kind, "ignoring credentials, the driver does not use them");
                url.to_string()
            }
            None => url.to_string(),
        };

        let span = info_span!("Open connection", driver = %self.kind);
        let connection: Box<dyn Connection> = match self.kind {
            DriverKind::Postgres => Box::new(
                SqlxConnection::<Postgres>::open(&url, redacted_url)
                    .instrument(span)
                    .await?,
            ),
            DriverKind::MySql => Box::new(
                SqlxConnection::<MySql>::open(&url, redacted_url)
                    .instrument(span)
                    .await?,
            ),
            DriverKind::Sqlite => Box::new(
                SqlxConnection::<Sqlite>::open(&url, redacted_url)
                    .instrument(span)
                    .await?,
            ),
        };
        Ok(connection)
    }
}

/// A single sqlx connection.
struct SqlxConnection<DB: Backend> {
    inner: DB::Connection,
    redacted_url: String,
}

impl<DB: Backend> SqlxConnection<DB> {
    async fn open(url: &str, redacted_url: String) -> Result<Self, Error> {
        let inner = <DB::Connection as sqlx::Connection>::connect(url)
            .await
            .map_err(|err| Error::connection(redacted_url.clone(), err))?;
        Ok(SqlxConnection {
            inner,
            redacted_url,
        })
    }
}

#[async_trait]
impl<DB> Connection for SqlxConnection<DB>
where
    DB: Backend,
    for<'e> &'e mut DB::Connection: Executor<'e, Database = DB>,
    for<'q> <DB as HasArguments<'q>>::Arguments: IntoArguments<'q, DB>,
{
    async fn prepare<'c>(
        &'c mut self,
        sql: &str,
        fetch_size: Option<u32>,
        parameters: &[Option<String>],
    ) -> Result<Box<dyn Statement + 'c>, Error> {
        let prepared = sqlx::Executor::prepare(&mut self.inner, sql)
            .await
            .map_err(prepare_error)?;
        let statement = sqlx::Statement::to_owned(&prepared);

        let parameters = typed_parameters::<DB>(&statement, parameters)?;
        let prefetch = fetch_size.map_or(1, |size| {
            usize::try_from(size).unwrap_or(usize::MAX).max(1)
        });
        debug!(
            parameters = parameters.len(),
            prefetch, "prepared statement"
        );

        Ok(Box::new(SqlxStatement::<DB> {
            connection: &mut self.inner,
            statement,
            parameters,
            prefetch,
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), Error> {
        let SqlxConnection {
            inner,
            redacted_url,
        } = *self;
        sqlx::Connection::close(inner)
            .await
            .map_err(|err| Error::connection(redacted_url, err))
    }
}

/// Only the database rejecting the statement is a syntax error. Anything else, such as a
/// column type the driver cannot describe, is an execution failure.
fn prepare_error(error: sqlx::Error) -> Error {
    match error {
        sqlx::Error::Database(_) => Error::query_syntax(error),
        _ => Error::execution(error),
    }
}

/// Check the parameter count against the placeholders and convert each value to the type
/// of its placeholder, where the database reports one.
fn typed_parameters<DB: Backend>(
    statement: &<DB as HasStatement<'static>>::Statement,
    parameters: &[Option<String>],
) -> Result<Vec<Parameter>, Error> {
    let placeholders = sqlx::Statement::parameters(statement);
    let expected = placeholders.as_ref().map(|placeholders| match placeholders {
        Either::Left(types) => types.len(),
        Either::Right(count) => *count,
    });
    if let Some(expected) = expected {
        if expected != parameters.len() {
            return Err(Error::Bind {
                expected,
                actual: parameters.len(),
            });
        }
    }

    let type_names: Vec<&str> = match &placeholders {
        Some(Either::Left(types)) => types.iter().map(|type_info| type_info.name()).collect(),
        _ => Vec::new(),
    };
    parameters
        .iter()
        .enumerate()
        .map(|(index, value)| {
            parameters::convert(
                index + 1,
                value.as_deref(),
                type_names.get(index).copied(),
            )
        })
        .collect()
}

/// A statement prepared on a [`SqlxConnection`].
struct SqlxStatement<'c, DB: Backend> {
    connection: &'c mut DB::Connection,
    statement: <DB as HasStatement<'static>>::Statement,
    parameters: Vec<Parameter>,
    /// Rows pulled from the server before `execute` returns.
    prefetch: usize,
}

#[async_trait]
impl<DB> Statement for SqlxStatement<'_, DB>
where
    DB: Backend,
    for<'e> &'e mut DB::Connection: Executor<'e, Database = DB>,
    for<'q> <DB as HasArguments<'q>>::Arguments: IntoArguments<'q, DB>,
{
    fn sql(&self) -> &str {
        sqlx::Statement::sql(&self.statement)
    }

    async fn execute<'s>(&'s mut self) -> Result<Box<dyn Cursor + 's>, Error> {
        let arguments = DB::arguments(&self.parameters);
        let mut rows = sqlx::Statement::query_with(&self.statement, arguments)
            .fetch(&mut *self.connection);

        let mut buffered = VecDeque::with_capacity(self.prefetch.min(1024));
        let mut exhausted = false;
        while buffered.len() < self.prefetch {
            match rows.try_next().await.map_err(Error::execution)? {
                Some(row) => buffered.push_back(row),
                None => {
                    exhausted = true;
                    break;
                }
            }
        }

        Ok(Box::new(SqlxCursor::<DB> {
            rows,
            buffered,
            exhausted,
        }))
    }
}

/// The rows of one execution of a [`SqlxStatement`].
struct SqlxCursor<'s, DB: Backend> {
    rows: BoxStream<'s, Result<DB::Row, sqlx::Error>>,
    buffered: VecDeque<DB::Row>,
    exhausted: bool,
}

impl<DB: Backend> SqlxCursor<'_, DB> {
    async fn advance(&mut self) -> Result<Option<DB::Row>, Error> {
        if let Some(row) = self.buffered.pop_front() {
            return Ok(Some(row));
        }
        if self.exhausted {
            return Ok(None);
        }
        let next = self.rows.try_next().await.map_err(Error::fetch)?;
        self.exhausted = next.is_none();
        Ok(next)
    }
}

#[async_trait]
impl<DB: Backend> Cursor for SqlxCursor<'_, DB> {
    async fn next_row(&mut self) -> Result<Option<Row>, Error> {
        match self.advance().await? {
            Some(row) => decode_row::<DB>(&row).map(Some).map_err(Error::fetch),
            None => Ok(None),
        }
    }

    async fn skip_row(&mut self) -> Result<bool, Error> {
        Ok(self.advance().await?.is_some())
    }

    async fn close(self: Box<Self>) -> Result<(), Error> {
        let SqlxCursor {
            mut rows,
            buffered,
            exhausted,
        } = *self;
        let mut drained = buffered.len();
        if !exhausted {
            while rows.try_next().await.map_err(Error::fetch)?.is_some() {
                drained += 1;
            }
        }
        debug!(drained, "closed cursor");
        Ok(())
    }
}

fn decode_row<DB: Backend>(row: &DB::Row) -> Result<Row, sqlx::Error> {
    row.columns()
        .iter()
        .map(|column| {
            Ok(Field {
                name: column.name().to_string(),
                value: DB::decode_value(row, column.ordinal())?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map(Row::new)
}
