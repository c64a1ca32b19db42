//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the client and server halves of the synchronization core. All types are
//! designed for serialization and transmission over the real-time channel
//! and the REST surface.

/// Message record and the pure reconciliation merge
pub mod message;

/// Unordered conversation pair key
pub mod conversation;

/// Real-time wire event envelope
pub mod event;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use conversation::ConversationKey;
pub use error::SharedError;
pub use event::{ClientEvent, ServerEvent};
pub use message::{validate_content, Message, MAX_CONTENT_LEN};
