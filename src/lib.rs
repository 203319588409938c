//! sqladapter - A thin driver adapter between a generic connection/statement/result
//! contract and a native database client library.
//!
//! The native library sits behind [`traits::NativeClient`]; this crate only
//! translates calls and wraps what comes back. Every call blocks until the
//! native library returns.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use sqladapter::drivers::{InMemoryNativeClient, InMemoryResponseBuilder};
//! use sqladapter::types::{ConnectionParameters, SqlValue};
//! use sqladapter::Driver;
//!
//! let client = Arc::new(InMemoryNativeClient::new().with_response(
//!     InMemoryResponseBuilder::new().columns(&["ID"]).row([1]).row([2]).build(),
//! ));
//! let params = ConnectionParameters::new()
//!     .set("host", "db1")
//!     .set("user", "u")
//!     .set("password", "p")
//!     .set("database", "orders");
//! let mut driver = Driver::new(client, params);
//!
//! // Ad hoc path
//! let ids: Vec<SqlValue> = driver
//!     .connection()
//!     .execute("SELECT ID FROM ORDERS")
//!     .unwrap()
//!     .map(|row| row.unwrap().get("ID").unwrap().clone())
//!     .collect();
//! assert_eq!(ids, vec![SqlValue::Int32(1), SqlValue::Int32(2)]);
//!
//! // Prepared path
//! let mut statement = driver.create_statement("INSERT INTO T(A) VALUES (?)");
//! let result = statement
//!     .execute(Some(vec![SqlValue::from(42)].into()))
//!     .unwrap();
//! assert!(!result.is_query_result());
//! ```

pub mod drivers;
pub mod error;
pub mod profiler;
pub mod traits;
pub mod types;

mod connection;
mod driver;
mod result_set;
mod statement;

// Re-export main types for convenient access
pub use connection::Connection;
pub use driver::Driver;
pub use error::{AdapterError, NativeError, Result};
pub use result_set::{CursorState, ResultKind, ResultSet};
pub use statement::Statement;
pub use traits::{NativeClient, NativeConnection, NativeCursor, QueryOutcome};
pub use types::{ConnectionParameters, ParameterContainer, Parameters, Row, SqlValue};
