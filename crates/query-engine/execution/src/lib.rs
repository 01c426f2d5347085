//! Query execution against a relational database.
//!
//! Drivers are looked up by name in a [`registry::DriverRegistry`] and expose a small
//! capability set: connect, prepare, execute and fetch. Fetching goes through
//! [`window::fetch_window`], which applies the row offset and row limit.

mod backend;
pub mod connection_url;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod parameters;
pub mod registry;
pub mod sqlx_driver;
pub mod window;

pub use driver::{Connection, Credentials, Cursor, Driver, Field, Row, Statement};
pub use error::Error;
pub use registry::DriverRegistry;
pub use window::{fetch_window, Window};
