//! Catalog storage.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP layer (handlers.rs)                                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service layer (services.rs)                             │
//! │  - validation, not-found mapping                         │
//! │  - favorite revival, team hydration                      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/mod.rs)                   │
//! └───────────┬─────────────────────────────┬───────────────┘
//!             │                             │
//!   ┌─────────▼─────────┐         ┌─────────▼─────────┐
//!   │ LocalRepository   │         │ PostgresRepository │
//!   │ (in-memory)       │         │ (Diesel, feature)  │
//!   └───────────────────┘         └────────────────────┘
//! ```
//!
//! The binary builds one repository through [`RepositoryFactory`] and hands
//! it to the HTTP state as `Arc<dyn FullRepository>`.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, FavoriteRepository, FullRepository, PlayerRepository, RepositoryError,
    RepositoryResult, StandingRepository, TeamRepository,
};
pub use services::{PlayerDetail, ServiceError, ServiceResult, StandingEntry};
