mod tool_arguments;

pub use tool_arguments::{prepare_tool_start, tool_start_message};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AgentMessage, ReportKind};

/// Destination for structured accounting and journal records.
#[async_trait]
pub trait ReportingSink: Send + Sync {
    fn name(&self) -> &str;

    async fn write_message(&self, message: AgentMessage) -> LedgerResult<()>;
}

pub type DynReportingSink = Arc<dyn ReportingSink>;

/// Keeps the most recent messages in memory, evicting the oldest.
pub struct MemoryJournal {
    messages: Mutex<VecDeque<AgentMessage>>,
    max_history: usize,
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            max_history: 1000,
        }
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn messages(&self) -> Vec<AgentMessage> {
        self.messages.lock().iter().cloned().collect()
    }

    pub fn messages_of_kind(&self, kind: ReportKind) -> Vec<AgentMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl ReportingSink for MemoryJournal {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write_message(&self, message: AgentMessage) -> LedgerResult<()> {
        let mut messages = self.messages.lock();
        if self.max_history == 0 {
            return Ok(());
        }
        while messages.len() >= self.max_history {
            messages.pop_front();
        }
        messages.push_back(message);
        Ok(())
    }
}

/// Forwards messages to a consumer over a bounded channel.
///
/// Never waits for buffer space: a full buffer drops the message with
/// `SinkWriteFailed`.
pub struct ChannelJournal {
    sender: mpsc::Sender<AgentMessage>,
}

impl ChannelJournal {
    pub fn new(sender: mpsc::Sender<AgentMessage>) -> Self {
        Self { sender }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<AgentMessage>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl ReportingSink for ChannelJournal {
    fn name(&self) -> &str {
        "channel"
    }

    async fn write_message(&self, message: AgentMessage) -> LedgerResult<()> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(message) => LedgerError::SinkWriteFailed(format!(
                "journal channel full, dropped {} message for {}",
                message.kind, message.agent_name
            )),
            TrySendError::Closed(_) => LedgerError::SinkClosed,
        })
    }
}

/// Emits each message as a structured `info!` event.
#[derive(Debug, Default)]
pub struct TracingJournal;

impl TracingJournal {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportingSink for TracingJournal {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn write_message(&self, message: AgentMessage) -> LedgerResult<()> {
        let structure = serde_json::to_string(&message.structure)?;
        info!(
            agent = %message.agent_name,
            origin = %message.origin,
            kind = %message.kind,
            message_id = %message.id,
            structure = %structure,
            "Agent message"
        );
        Ok(())
    }
}
