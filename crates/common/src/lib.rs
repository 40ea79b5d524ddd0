//! Common utilities and shared types for foodgram.
//!
//! - **Configuration**: server, database and application settings via [`Config`]
//! - **Error handling**: unified error taxonomy via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID entity ids and opaque tokens via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use foodgram_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} -> {}", config.server.port, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::{AppSettings, Config};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
