//! Common utilities and shared types for hasker-rs.
//!
//! This crate provides foundational components used across all hasker-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Relative time**: Human readable "N minute(s) ago" labels via [`time_ago`]
//!
//! # Example
//!
//! ```no_run
//! use hasker_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID {} for {}", id, config.site.name);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod time;

pub use config::{Config, DatabaseConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use time::{time_ago, time_ago_from_now};
