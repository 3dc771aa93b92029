//! Services - widget state machines and session management
//!
//! - `scheduler` - virtual-clock timer queue shared by every widget
//! - `phase_table` - declarative timed phase chains
//! - `view_state` - device screen, tagging and tab selection
//! - `voice_demo`, `chat_demo`, `video_carousel` - simulated demo widgets
//! - `subscribe_form` - form busy flag and transient notice
//! - `subscription` - subscriber insert with duplicate-as-success semantics
//! - `page` - one visitor's landing page
//! - `session` - per-visitor session registry and expiry

pub mod chat_demo;
pub mod page;
pub mod phase_table;
pub mod scheduler;
pub mod session;
pub mod subscribe_form;
pub mod subscription;
pub mod video_carousel;
pub mod view_state;
pub mod voice_demo;

// Re-export commonly used types
pub use page::LandingPage;
pub use session::SessionRegistry;
pub use subscription::{SubscriberStore, SubscriptionClient};
