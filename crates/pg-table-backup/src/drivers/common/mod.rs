//! Connection plumbing shared by drivers.
//!
//! - [`tls`]: rustls connectors for PostgreSQL `sslmode` values

pub mod tls;

pub use tls::SslMode;
