pub mod error;
pub mod schema_sql;
pub mod store;

pub use error::{Result, SessionStoreError};
pub use store::SqliteSessionStore;
