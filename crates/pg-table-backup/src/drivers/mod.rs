//! Database drivers implementing the core capability traits.

pub mod common;
pub mod postgres;

pub use postgres::PgSession;
