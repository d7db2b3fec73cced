//! PostgreSQL driver.
//!
//! - [`PgSession`]: one connection per run, implementing schema inspection,
//!   row reads, and transactional statement execution
//! - `convert`: mapping of result columns to [`SqlValue`](crate::core::SqlValue)s

mod convert;
mod session;

pub use session::PgSession;
