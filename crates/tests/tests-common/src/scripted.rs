//! An in-memory driver whose behaviour is scripted by the test.
//!
//! Every cursor yields the rows `{"id": 0}` to `{"id": rows - 1}`. The driver counts the
//! calls it receives and can be told to fail at any step.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use perfinder_configuration::BenchmarkConfig;
use query_engine_execution::{
    Connection, Credentials, Cursor, Driver, DriverRegistry, Error, Row, Statement,
};

/// The identifier the scripted driver is registered under.
pub const SCRIPTED_DRIVER: &str = "scripted";

/// What the driver does.
#[derive(Debug, Clone)]
pub struct Script {
    /// Rows produced by every execution.
    pub rows: usize,
    /// Placeholders reported for every statement; `None` when unknown.
    pub placeholders: Option<usize>,
    pub fail_connect: bool,
    /// Reject every statement as a syntax error.
    pub fail_prepare: bool,
    /// Fail the nth execution, counted from 1 across the whole run.
    pub fail_execute: Option<usize>,
    /// Fail reading rows from the nth execution.
    pub fail_fetch: Option<usize>,
    /// Fail closing the connection.
    pub fail_close: bool,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            rows: 10,
            placeholders: None,
            fail_connect: false,
            fail_prepare: false,
            fail_execute: None,
            fail_fetch: None,
            fail_close: false,
        }
    }
}

/// The calls a driver received.
#[derive(Debug, Default)]
pub struct Calls {
    connects: AtomicUsize,
    prepares: AtomicUsize,
    executes: AtomicUsize,
    rows_read: AtomicUsize,
    cursor_closes: AtomicUsize,
    closes: AtomicUsize,
}

/// A snapshot of [`Calls`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub connects: usize,
    pub prepares: usize,
    pub executes: usize,
    /// Rows handed out by cursors, skipped or not.
    pub rows_read: usize,
    pub cursor_closes: usize,
    pub closes: usize,
}

impl Calls {
    pub fn counts(&self) -> CallCounts {
        CallCounts {
            connects: self.connects.load(Ordering::SeqCst),
            prepares: self.prepares.load(Ordering::SeqCst),
            executes: self.executes.load(Ordering::SeqCst),
            rows_read: self.rows_read.load(Ordering::SeqCst),
            cursor_closes: self.cursor_closes.load(Ordering::SeqCst),
            closes: self.closes.load(Ordering::SeqCst),
        }
    }
}

/// Increment a counter and return its new value.
fn bump(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

pub struct ScriptedDriver {
    script: Script,
    calls: Arc<Calls>,
}

impl ScriptedDriver {
    pub fn new(script: Script) -> Self {
        ScriptedDriver {
            script,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Arc<Calls> {
        self.calls.clone()
    }

    /// A registry holding only this driver, under [`SCRIPTED_DRIVER`].
    pub fn into_registry(self) -> DriverRegistry {
        let mut registry = DriverRegistry::empty();
        registry.register(SCRIPTED_DRIVER, Arc::new(self));
        registry
    }
}

/// A configuration that selects the scripted driver.
pub fn scripted_config(query: &str) -> BenchmarkConfig {
    BenchmarkConfig::new(SCRIPTED_DRIVER, "scripted://localhost", query)
}

/// The row at position `id` of every result set.
pub fn row(id: usize) -> Row {
    [("id", json!(id))].into_iter().collect()
}

#[async_trait]
impl Driver for ScriptedDriver {
    fn name(&self) -> &str {
        SCRIPTED_DRIVER
    }

    async fn connect(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Connection>, Error> {
        bump(&self.calls.connects);
        if self.script.fail_connect {
            return Err(Error::connection(url, "connection refused"));
        }
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
            calls: self.calls.clone(),
        }))
    }
}

struct ScriptedConnection {
    script: Script,
    calls: Arc<Calls>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn prepare<'c>(
        &'c mut self,
        sql: &str,
        _fetch_size: Option<u32>,
        parameters: &[Option<String>],
    ) -> Result<Box<dyn Statement + 'c>, Error> {
        bump(&self.calls.prepares);
        if self.script.fail_prepare {
            return Err(Error::query_syntax(format!("syntax error in '{sql}'")));
        }
        if let Some(expected) = self.script.placeholders {
            if expected != parameters.len() {
                return Err(Error::Bind {
                    expected,
                    actual: parameters.len(),
                });
            }
        }
        Ok(Box::new(ScriptedStatement {
            sql: sql.to_string(),
            script: &self.script,
            calls: self.calls.as_ref(),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), Error> {
        bump(&self.calls.closes);
        if self.script.fail_close {
            return Err(Error::connection("scripted://localhost", "broken pipe"));
        }
        Ok(())
    }
}

struct ScriptedStatement<'c> {
    sql: String,
    script: &'c Script,
    calls: &'c Calls,
}

#[async_trait]
impl<'c> Statement for ScriptedStatement<'c> {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn execute<'s>(&'s mut self) -> Result<Box<dyn Cursor + 's>, Error> {
        let execution = bump(&self.calls.executes);
        if self.script.fail_execute == Some(execution) {
            return Err(Error::execution(format!("execution {execution} failed")));
        }
        Ok(Box::new(ScriptedCursor {
            next: 0,
            rows: self.script.rows,
            fail: self.script.fail_fetch == Some(execution),
            calls: self.calls,
        }))
    }
}

struct ScriptedCursor<'s> {
    next: usize,
    rows: usize,
    fail: bool,
    calls: &'s Calls,
}

impl ScriptedCursor<'_> {
    fn advance(&mut self) -> Result<Option<usize>, Error> {
        if self.fail {
            return Err(Error::fetch("connection reset while reading rows"));
        }
        if self.next >= self.rows {
            return Ok(None);
        }
        let id = self.next;
        self.next += 1;
        bump(&self.calls.rows_read);
        Ok(Some(id))
    }
}

#[async_trait]
impl<'s> Cursor for ScriptedCursor<'s> {
    async fn next_row(&mut self) -> Result<Option<Row>, Error> {
        Ok(self.advance()?.map(row))
    }

    async fn skip_row(&mut self) -> Result<bool, Error> {
        Ok(self.advance()?.is_some())
    }

    async fn close(self: Box<Self>) -> Result<(), Error> {
        bump(&self.calls.cursor_closes);
        Ok(())
    }
}
