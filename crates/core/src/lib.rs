//! Askstore Core Library
//!
//! This crate provides the foundational pieces shared by every askstore crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Conversation and fragment types exchanged between retrieval and generation

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use types::{ConversationTurn, Fragment, Role};
