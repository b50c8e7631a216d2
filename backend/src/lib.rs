//! # Soccer Catalog Backend
//!
//! REST backend for a soccer catalog: teams, players, per-user favorite
//! teams and league standings, with keyword search, pagination, signed
//! bearer tokens, per-route rate limits and image uploads.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`models`]: entities, id newtypes, create/update payloads, pagination
//! - [`search`]: keyword normalization, sort keys, relevance ranking
//! - [`db`]: repository traits, local and postgres backends, service layer
//! - [`storage`]: uploaded image files and their public URLs
//! - [`auth`]: roles, scopes and token signing
//! - [`config`]: TOML + environment configuration
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod search;
pub mod storage;
