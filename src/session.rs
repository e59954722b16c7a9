//! Application-wide session signal.
//!
//! The refresh coordinator emits [`SessionEvent::Expired`] exactly once per failed refresh
//! cycle. Any number of independent listeners (login redirects, caches, sockets) subscribe and
//! react; the event carries no payload beyond "the session ended".

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
// self
use crate::_prelude::*;

/// Session lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
	/// Token renewal failed and stored credentials were cleared.
	Expired,
}

/// Fire-and-forget broadcaster for [`SessionEvent`]s.
#[derive(Debug, Default)]
pub struct SessionSignal {
	subscribers: Mutex<Vec<UnboundedSender<SessionEvent>>>,
	emitted: AtomicU64,
}
impl SessionSignal {
	/// Registers a listener; the returned stream yields every event emitted afterwards.
	pub fn subscribe(&self) -> UnboundedReceiver<SessionEvent> {
		let (tx, rx) = mpsc::unbounded();

		self.subscribers.lock().push(tx);

		rx
	}

	/// Broadcasts an event, pruning listeners that have gone away.
	pub fn emit(&self, event: SessionEvent) {
		self.emitted.fetch_add(1, Ordering::Relaxed);
		self.subscribers.lock().retain(|tx| tx.unbounded_send(event).is_ok());
	}

	/// Total number of events emitted so far.
	pub fn emitted(&self) -> u64 {
		self.emitted.load(Ordering::Relaxed)
	}

	/// Number of live listeners.
	pub fn subscriber_count(&self) -> usize {
		let mut subscribers = self.subscribers.lock();

		subscribers.retain(|tx| !tx.is_closed());

		subscribers.len()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use futures::{FutureExt, StreamExt};
	// self
	use super::*;

	#[tokio::test]
	async fn every_subscriber_sees_the_event() {
		let signal = SessionSignal::default();
		let mut first = signal.subscribe();
		let mut second = signal.subscribe();

		signal.emit(SessionEvent::Expired);

		assert_eq!(first.next().await, Some(SessionEvent::Expired));
		assert_eq!(second.next().await, Some(SessionEvent::Expired));
		assert!(first.next().now_or_never().is_none());
		assert_eq!(signal.emitted(), 1);
	}

	#[test]
	fn dropped_subscribers_are_pruned() {
		let signal = SessionSignal::default();
		let kept = signal.subscribe();

		drop(signal.subscribe());
		signal.emit(SessionEvent::Expired);

		assert_eq!(signal.subscriber_count(), 1);

		drop(kept);

		assert_eq!(signal.subscriber_count(), 0);
	}
}
