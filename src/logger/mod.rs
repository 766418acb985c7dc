pub mod console_sink;
pub mod memory_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::memory_sink::{MemoryLogSink, SharedLogBuffer};
pub use self::types::{DecisionAction, DecisionLogEntry, DecisionLogSink};

use std::sync::Arc;
use tokio::sync::mpsc;

struct SinkHandle {
    tx: mpsc::Sender<DecisionLogEntry>,
    // Indexed by `DecisionAction as usize`.
    accepts: [bool; 3],
}

/// Fans decision entries out to sinks, each drained by its own task.
pub struct DecisionLogger {
    sinks: Vec<SinkHandle>,
}

impl DecisionLogger {
    /// Spawns one draining task per sink, so it must run inside a tokio runtime.
    pub fn new(sinks: Vec<Box<dyn DecisionLogSink>>) -> Arc<Self> {
        let senders = sinks
            .into_iter()
            .map(|sink| {
                let accepts = DecisionAction::ALL.map(|action| sink.accepts(action));
                let (tx, mut rx) = mpsc::channel::<DecisionLogEntry>(1000);
                tokio::spawn(async move {
                    while let Some(entry) = rx.recv().await {
                        sink.log(&entry);
                    }
                });
                SinkHandle { tx, accepts }
            })
            .collect();

        Arc::new(Self { sinks: senders })
    }

    pub fn disabled() -> Arc<Self> {
        Arc::new(Self { sinks: Vec::new() })
    }

    pub fn is_enabled(&self) -> bool {
        !self.sinks.is_empty()
    }

    /// True when at least one sink records `action`. Lets callers skip
    /// building entries nobody will see.
    pub fn wants(&self, action: DecisionAction) -> bool {
        self.sinks.iter().any(|sink| sink.accepts[action as usize])
    }

    pub fn log(&self, entry: DecisionLogEntry) {
        let action = entry.action as usize;
        for sink in self.sinks.iter().filter(|sink| sink.accepts[action]) {
            // Fire and forget, never stall a request on a full buffer
            let _ = sink.tx.try_send(entry.clone());
        }
    }
}
