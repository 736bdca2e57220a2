//! Slice-scoped change notification.
//!
//! Views subscribe only to the slices of state they read, so an unrelated
//! mutation (say, a new brush gesture) never reaches the contribution chart.

use std::fmt;

/// A separately observable part of the dashboard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Filter,
    Selection,
    Brush,
    TopRecommendations,
    Ratings,
    Focus,
    Projection,
}

impl Slice {
    pub const ALL: [Slice; 7] = [
        Slice::Filter,
        Slice::Selection,
        Slice::Brush,
        Slice::TopRecommendations,
        Slice::Ratings,
        Slice::Focus,
        Slice::Projection,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(Slice) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    slices: Vec<Slice>,
    callback: Callback,
}

/// Registry of change callbacks keyed by slice.
#[derive(Default)]
pub struct Notifier {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Notifier {
    /// Register `callback` for changes to any of `slices`.
    pub fn subscribe<F>(&mut self, slices: &[Slice], callback: F) -> SubscriptionId
    where
        F: Fn(Slice) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            slices: slices.to_vec(),
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver a change of `slice` to every interested subscriber, in
    /// registration order.
    pub fn notify(&self, slice: Slice) {
        for subscriber in self.subscribers.iter().filter(|s| s.slices.contains(&slice)) {
            (subscriber.callback)(slice);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(Slice) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn only_subscribed_slices_are_delivered() {
        let mut n = Notifier::default();
        let (hits, cb) = counter();
        n.subscribe(&[Slice::Selection, Slice::Brush], cb);
        n.notify(Slice::Filter);
        n.notify(Slice::Selection);
        n.notify(Slice::Brush);
        n.notify(Slice::Ratings);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut n = Notifier::default();
        let (hits, cb) = counter();
        let id = n.subscribe(&Slice::ALL, cb);
        n.notify(Slice::Focus);
        assert!(n.unsubscribe(id));
        assert!(!n.unsubscribe(id));
        n.notify(Slice::Focus);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(n.is_empty());
    }
}
