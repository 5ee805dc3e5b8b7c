//! Execution engine.
//!
//! - [`connection`] - the driver boundary and a scripted in-memory connection
//! - [`sqlite`] - the rusqlite-backed connection
//! - [`persistence`] - identity map, collections and the batch-load queue
//! - [`executor`] - translate, bind, execute and consume
//! - [`session`] - the user-facing unit of work

pub mod connection;
pub mod executor;
pub mod persistence;
pub mod session;
pub mod sqlite;

pub use connection::{Connection, ExecutedStatement, MemoryConnection, MemoryResultSet, ResultSet};
pub use executor::{QueryExecutor, SessionStatistics};
pub use persistence::{
    CollectionHandle, EntityHandle, EntityInstance, EntityKey, EntityStatus, PersistenceContext,
    PersistentCollection,
};
pub use session::Session;
pub use sqlite::SqliteConnection;
