//! Domain models - transient demo state and subscriber records
//!
//! This module contains the canonical data types used throughout the system:
//! - `ScreenMode` / `TagCard` / `ActiveTab` - phone mockup state
//! - `ChatMessage` - chat demo transcript entries
//! - `SubscriptionRecord` / `SubscribeResult` - email capture
//! - `content` - fixed demo copy (lectures, canned replies)

pub mod content;
pub mod types;

// Re-export commonly used types at module level
pub use types::{
    ActiveTab, ChatMessage, ChatRole, ScreenMode, SubscribeResult, SubscriptionRecord, TagCard,
};
