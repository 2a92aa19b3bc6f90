//! Ordered chat history with a single in-flight placeholder

use thiserror::Error;

use crate::state::{Author, Message, MessageStatus, RenderMode};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("no pending message matches handle {0:?}")]
    UnknownHandle(PendingHandle),

    #[error("cannot clear the conversation while a response is pending")]
    PendingInFlight,
}

/// Identifies the pending placeholder returned by
/// [`ConversationLog::append_pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingHandle(u64);

/// Append-only message log.
///
/// The only in-place edits allowed are resolving or removing the pending
/// placeholder, and there is never more than one of those.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
    // (handle, index into messages)
    pending: Option<(PendingHandle, usize)>,
    next_handle: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn append_final(
        &mut self,
        author: Author,
        body: impl Into<String>,
        render_mode: RenderMode,
    ) {
        self.messages.push(Message {
            author,
            body: body.into(),
            render_mode,
            status: MessageStatus::Final,
        });
    }

    /// Append the "thinking" placeholder. Returns `None` and leaves the log
    /// untouched if one is already outstanding.
    pub fn append_pending(&mut self) -> Option<PendingHandle> {
        if self.pending.is_some() {
            return None;
        }

        let handle = PendingHandle(self.next_handle);
        self.next_handle += 1;
        self.pending = Some((handle, self.messages.len()));
        self.messages.push(Message::pending());
        Some(handle)
    }

    /// Replace the placeholder with a final message in the same slot.
    pub fn resolve_pending(
        &mut self,
        handle: PendingHandle,
        body: impl Into<String>,
        render_mode: RenderMode,
    ) -> Result<(), ConversationError> {
        let index = self.take_pending(handle)?;
        let slot = &mut self.messages[index];
        slot.body = body.into();
        slot.render_mode = render_mode;
        slot.status = MessageStatus::Final;
        Ok(())
    }

    pub fn remove_pending(&mut self, handle: PendingHandle) -> Result<(), ConversationError> {
        let index = self.take_pending(handle)?;
        self.messages.remove(index);
        Ok(())
    }

    /// Start a fresh conversation.
    pub fn clear(&mut self) -> Result<(), ConversationError> {
        if self.pending.is_some() {
            return Err(ConversationError::PendingInFlight);
        }
        self.messages.clear();
        Ok(())
    }

    fn take_pending(&mut self, handle: PendingHandle) -> Result<usize, ConversationError> {
        match self.pending {
            Some((current, index)) if current == handle => {
                self.pending = None;
                Ok(index)
            }
            _ => Err(ConversationError::UnknownHandle(handle)),
        }
    }
}
