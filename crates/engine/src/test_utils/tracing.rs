//! A `tracing-subscriber` layer that records emitted events, for asserting on the warnings logged
//! by best-effort paths.

use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// The event level.
    pub level: Level,
    /// The event target.
    pub target: String,
    /// The formatted message.
    pub message: String,
}

/// Shared storage of recorded events.
#[derive(Debug, Default, Clone)]
pub struct TraceStorage(pub Arc<Mutex<Vec<TraceRecord>>>);

impl TraceStorage {
    /// Returns the messages recorded at `level`.
    pub fn get_by_level(&self, level: Level) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|record| record.level == level)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Returns the messages recorded under `target`.
    pub fn get_by_target(&self, target: &str) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|record| record.target == target)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Locks the storage.
    pub fn lock(&self) -> MutexGuard<'_, Vec<TraceRecord>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Records every event into a [TraceStorage].
#[derive(Debug, Default)]
pub struct CollectingLayer {
    /// Where events are recorded.
    pub storage: TraceStorage,
}

impl CollectingLayer {
    /// Creates a layer recording into `storage`.
    pub const fn new(storage: TraceStorage) -> Self {
        Self { storage }
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CollectingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        self.storage.lock().push(TraceRecord {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.0,
        });
    }
}
