pub mod api;
pub mod config;
pub mod context;
pub mod controller;
pub mod conversation;
pub mod state;

// Re-export main types for convenience
pub use api::{Backend, HttpBackend, RequestFailure, RequestOutcome};
pub use config::Config;
pub use context::{ContextStore, FileStore, MemoryStore};
pub use controller::{execute, Command, Controller, Dispatch, Rejection, UiEvent};
pub use conversation::ConversationLog;
pub use state::{Author, Message, MessageStatus, RenderMode};
