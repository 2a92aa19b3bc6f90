//! UI-agnostic conversation types
//!
//! These are shared by every front end (the TUI, the one-shot CLI commands)
//! and carry no dependency on a terminal or widget library.

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Assistant,
}

/// How a message body should be displayed.
///
/// `PlainText` bodies are shown verbatim. `RichText` bodies are handed to the
/// front end's markdown styler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    PlainText,
    RichText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Final,
    /// Placeholder shown while a response is outstanding
    Pending,
}

/// A single chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: Author,
    pub body: String,
    pub render_mode: RenderMode,
    pub status: MessageStatus,
}

impl Message {
    /// A question typed by the user. Always plain text so nothing the user
    /// types is interpreted as markup.
    pub fn user(body: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            body: body.into(),
            render_mode: RenderMode::PlainText,
            status: MessageStatus::Final,
        }
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self {
            author: Author::Assistant,
            body: body.into(),
            render_mode: RenderMode::RichText,
            status: MessageStatus::Final,
        }
    }

    pub(crate) fn pending() -> Self {
        Self {
            author: Author::Assistant,
            body: String::new(),
            render_mode: RenderMode::RichText,
            status: MessageStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}
