//! A blocking PostgreSQL wire-protocol (v3) client.
//!
//! # Example
//!
//! ```no_run
//! use pgcore::{Connection, Options};
//!
//! # fn app() -> pgcore::Result<()> {
//! let mut conn = Connection::connect(Options::new("postgres", "localhost", 5432))?;
//!
//! for response in conn.perform("SELECT 1")? {
//!     if let pgcore::connection::Response::Row(row) = response {
//!         println!("{}", row.get(0).unwrap().as_str().unwrap());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! No async runtime is involved anywhere in this crate: every blocking call uses
//! readiness polling (see [`io::Transport`]) rather than a `Future`.
pub mod common;
pub mod connection;
pub mod data;
pub mod error;
pub mod io;
pub mod options;
pub mod pool;
pub mod protocol;
pub mod sql;
pub mod sqlstate;
pub mod statement;

pub use connection::Connection;
pub use data::{Composite, Data, Format, Row, RowInfo};
pub use error::{Error, ErrorKind, Result};
pub use options::Options;
pub use pool::{Handle, Pool, PoolOptions};
pub use sql::SqlString;
pub use sqlstate::SqlState;
pub use statement::{PortalName, PreparedStatement, StatementName};
