//! Core event types, the runtime channel, and one-shot timers.
//!
//! The main loop consumes a single bounded mpsc channel. Producers are the
//! window surface (input, resize), the filesystem monitor, preload workers,
//! and the timers below. Events from one producer arrive in order; the
//! bounded channel provides backpressure instead of dropping (blocking
//! producers park briefly rather than losing input).
//!
//! Redraws are coalesced by the consumer: any number of `Redraw` events
//! between two paint passes produce one paint.

use core_actions::ActionSeq;
use core_image::Image;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::task::JoinHandle;
use tracing::trace;

pub const EVENT_CHANNEL_CAP: usize = 1024;

// Telemetry counters (relaxed atomics, inspected by tests and logged on
// shutdown).
pub static EVENTS_DISPATCHED: AtomicU64 = AtomicU64::new(0);
pub static REDRAWS_COALESCED: AtomicU64 = AtomicU64::new(0);
pub static TIMER_ARMS: AtomicU64 = AtomicU64::new(0);
pub static TIMER_CANCELS: AtomicU64 = AtomicU64::new(0);

/// Top-level event union consumed by the central loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Repaint request; coalesced by the consumer.
    Redraw,
    /// Window dimensions changed.
    Resize(u32, u32),
    /// Pointer drag by a pixel delta.
    Drag { dx: i32, dy: i32 },
    /// A background decode finished for the entry at `index`.
    Load { image: Arc<Image>, index: usize },
    /// A background decode failed; the entry has been marked.
    LoadFailed { source: String, index: usize },
    /// Select and show the entry at `index` (gallery activation).
    Activate { index: usize },
    /// Execute an action sequence.
    Action(ActionSeq),
    /// The single-shot animation timer fired.
    AnimationTick,
    /// The slideshow timer fired.
    SlideshowTick,
    /// The filesystem monitor added an entry.
    ListAdded(Arc<Image>),
    /// The filesystem monitor removed the entry with this source.
    ListRemoved(String),
    /// An entry's backing file changed; the viewer should reload it.
    ListModified(Arc<Image>),
    Shutdown,
}

/// The runtime channel pair.
pub fn event_channel() -> (Sender<Event>, Receiver<Event>) {
    channel(EVENT_CHANNEL_CAP)
}

/// Single-shot monotonic timer for animation frames and slideshow steps.
///
/// Arming replaces any pending shot; image switches cancel and re-arm. The
/// payload event is sent once after the delay unless canceled first.
#[derive(Default)]
pub struct OneshotTimer {
    handle: Option<JoinHandle<()>>,
}

impl OneshotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, delay: Duration, tx: Sender<Event>, event: Event) {
        self.cancel();
        TIMER_ARMS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        trace!(target: "events.timer", ?delay, "armed");
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event).await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            TIMER_CANCELS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            handle.abort();
        }
    }

    pub fn armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for OneshotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub type EventResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use core_actions::{Action, ActionKind};

    #[tokio::test]
    async fn channel_delivers_in_order() {
        let (tx, mut rx) = event_channel();
        tx.send(Event::Redraw).await.unwrap();
        tx.send(Event::Action(vec![Action::new(ActionKind::NextFile)]))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(Event::Redraw)));
        match rx.recv().await {
            Some(Event::Action(seq)) => assert_eq!(seq[0].kind, ActionKind::NextFile),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oneshot_timer_fires_once() {
        let (tx, mut rx) = event_channel();
        let mut timer = OneshotTimer::new();
        timer.arm(Duration::from_millis(5), tx, Event::AnimationTick);
        assert!(matches!(rx.recv().await, Some(Event::AnimationTick)));
        // Nothing further arrives.
        let extra =
            tokio::time::timeout(Duration::from_millis(30), rx.recv()).await;
        assert!(extra.is_err() || extra.unwrap().is_none());
    }

    #[tokio::test]
    async fn rearm_replaces_pending_shot() {
        let (tx, mut rx) = event_channel();
        let mut timer = OneshotTimer::new();
        timer.arm(Duration::from_millis(50), tx.clone(), Event::SlideshowTick);
        timer.arm(Duration::from_millis(5), tx, Event::AnimationTick);
        assert!(matches!(rx.recv().await, Some(Event::AnimationTick)));
        let extra = tokio::time::timeout(Duration::from_millis(80), rx.recv()).await;
        match extra {
            Err(_) | Ok(None) => {}
            Ok(Some(event)) => panic!("replaced shot fired: {event:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_suppresses_delivery() {
        let (tx, mut rx) = event_channel();
        let mut timer = OneshotTimer::new();
        timer.arm(Duration::from_millis(10), tx, Event::SlideshowTick);
        timer.cancel();
        assert!(!timer.armed());
        let extra = tokio::time::timeout(Duration::from_millis(40), rx.recv()).await;
        assert!(extra.is_err() || extra.unwrap().is_none());
    }
}
