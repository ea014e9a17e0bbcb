//! # halodb
//!
//! A metadata server for omic samples and the processing steps derived
//! from them, usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! halodb = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use halodb::server::{AppState, create_router};
//! use halodb::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/halodb.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), 100));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod access;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod fields;
pub mod server;
pub mod store;
pub mod types;
