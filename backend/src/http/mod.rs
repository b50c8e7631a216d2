//! HTTP server for the soccer catalog.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum)                                        │
//! │  - request parsing (extract.rs, dto.rs)                   │
//! │  - bearer / internal token checks (extract.rs)            │
//! │  - per-route rate limits (rate_limit.rs)                  │
//! │  - JSON shaping and error mapping (dto.rs, error.rs)      │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (db::services)                             │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db::repository)                        │
//! │  - LocalRepository / PostgresRepository                   │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use error::AppError;
pub use rate_limit::RateLimiter;
pub use router::create_router;
pub use state::AppState;
