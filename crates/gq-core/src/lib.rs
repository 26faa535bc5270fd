//! GQ Core Library
//!
//! Core types and helpers shared by the GQ directory tools: errors,
//! configuration, DN handling and the checks a caller runs before
//! relocating entries.

pub mod config;
pub mod dn;
pub mod error;
pub mod guard;
pub mod refresh;
pub mod sink;
pub mod types;

pub use config::{GqConfig, LoggingConfig, ServerConfig};
pub use error::{Error, Result};
pub use guard::check_move;
pub use refresh::{RefreshQueue, RefreshRequest};
pub use sink::ErrorSink;
pub use types::{MoveFlags, MoveRequest, ServerId};

/// GQ version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
