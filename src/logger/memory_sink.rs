use super::{DecisionLogEntry, DecisionLogSink};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

pub type SharedLogBuffer = Arc<RwLock<VecDeque<DecisionLogEntry>>>;

/// Keeps the most recent decisions for a settings page or a test to inspect.
pub struct MemoryLogSink {
    buffer: SharedLogBuffer,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn get_recent(&self) -> Vec<DecisionLogEntry> {
        recent(&self.buffer)
    }

    // Allow sharing the buffer with whoever renders it
    pub fn clone_buffer(&self) -> SharedLogBuffer {
        self.buffer.clone()
    }
}

/// Oldest first.
pub fn recent(buffer: &SharedLogBuffer) -> Vec<DecisionLogEntry> {
    let buffer = buffer.read().unwrap_or_else(PoisonError::into_inner);
    buffer.iter().cloned().collect()
}

impl DecisionLogSink for MemoryLogSink {
    fn log(&self, entry: &DecisionLogEntry) {
        let mut buffer = self.buffer.write().unwrap_or_else(PoisonError::into_inner);
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry.clone());
    }
}
