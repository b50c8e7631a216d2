//! Repository implementations.
//!
//! - `local`: in-memory backend, the default
//! - `postgres`: Diesel backend, behind the `postgres-repo` feature
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use postgres::{PostgresConfig, PostgresRepository};
