//! Error sink
//!
//! Collects human-readable failure messages under a caller-supplied title.
//! Operations that report failure through a `None`/`false` return value push
//! at least one message here first; the caller decides how to surface them.

use tracing::{error, warn};

#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    title: String,
    messages: Vec<String>,
}

impl ErrorSink {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            messages: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(context = %self.title, "{}", message);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Drain collected messages, logging them as one block.
    pub fn flush(&mut self) -> Vec<String> {
        if !self.messages.is_empty() {
            error!(
                context = %self.title,
                count = self.messages.len(),
                "{}",
                self.messages.join("\n")
            );
        }
        std::mem::take(&mut self.messages)
    }
}
