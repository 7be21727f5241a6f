//! Log capture for assertions on emitted warnings

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Counts `WARN` events emitted on the current thread while installed
///
/// Under `#[tokio::test]` every spawned task runs on the test thread, so the
/// count covers servers and fetch tasks as well as the test body.
#[derive(Debug, Clone, Default)]
pub struct WarnCounter {
    count: Arc<AtomicUsize>,
}

impl WarnCounter {
    /// Install a fresh counter as the thread's default subscriber
    ///
    /// Events are counted until the returned guard is dropped.
    pub fn install() -> (Self, DefaultGuard) {
        let counter = Self::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (counter, guard)
    }

    /// Warnings seen so far
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
