use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use model::Snapshot;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::store::SnapshotQuery;

pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

pub type SubscriberId = u64;

struct Subscriber {
    queue: mpsc::Sender<Arc<Snapshot>>,
    last_revision: usize,
}

#[derive(Default)]
struct Registry {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fans snapshots out to any number of subscribers.
///
/// Each subscriber has its own bounded queue. Publishing never waits: a
/// subscriber whose queue is full or closed is removed.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Mutex<Registry>>,
    query: Arc<dyn SnapshotQuery>,
    queue_capacity: usize,
}

impl Broadcaster {
    pub fn new<Q: SnapshotQuery>(query: Q, queue_capacity: usize) -> Self {
        Self {
            registry: Arc::default(),
            query: Arc::new(query),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Registers a subscriber. Its queue already holds the current snapshot.
    pub fn subscribe(&self) -> Subscription {
        let (queue, receiver) = mpsc::channel(self.queue_capacity);

        // read the current snapshot under the registry lock, so that a publish
        // either happens before it (and is contained) or after the insert
        let mut registry = lock(&self.registry);
        let current = self.query.current_snapshot();
        let last_revision = current.revision();
        // cannot fail, the queue is new and has room for at least one
        let _ = queue.try_send(current);

        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(
            id,
            Subscriber {
                queue,
                last_revision,
            },
        );
        log::debug!("subscriber {} joined, {} live", id, registry.subscribers.len());

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        remove(&self.registry, id);
    }

    /// Enqueues `snapshot` for every subscriber that has not seen it or a newer
    /// one yet, and returns how many subscribers got it.
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> usize {
        let revision = snapshot.revision();
        let mut delivered = 0;

        let mut registry = lock(&self.registry);
        registry.subscribers.retain(|id, subscriber| {
            if revision <= subscriber.last_revision {
                return true;
            }
            match subscriber.queue.try_send(snapshot.clone()) {
                Ok(()) => {
                    subscriber.last_revision = revision;
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    log::warn!("subscriber {} is not keeping up, dropping it", id);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("subscriber {} is gone, dropping it", id);
                    false
                }
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

fn remove(registry: &Mutex<Registry>, id: SubscriberId) {
    let mut registry = lock(registry);
    if registry.subscribers.remove(&id).is_some() {
        log::debug!("subscriber {} left, {} live", id, registry.subscribers.len());
    }
}

/// Receiving end of a subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Snapshot>>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next snapshot. Returns `None` once the broadcaster has
    /// dropped this subscriber.
    pub async fn recv(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.try_recv().ok()
    }

    /// Stops accepting snapshots. The broadcaster notices on its next publish.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            remove(&registry, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;

    use model::{Coordinate, CoveragePolygon, Point};

    use super::*;

    #[derive(Clone, Default)]
    struct FixedQuery(Arc<RwLock<Arc<Snapshot>>>);

    impl FixedQuery {
        fn set(&self, snapshot: Arc<Snapshot>) {
            *self.0.write().unwrap() = snapshot;
        }
    }

    impl SnapshotQuery for FixedQuery {
        fn current_snapshot(&self) -> Arc<Snapshot> {
            self.0.read().unwrap().clone()
        }
    }

    fn snapshot_with(count: usize) -> Arc<Snapshot> {
        let points = (0..count)
            .map(|i| Point::observed_now(Coordinate::new(i as f64, 0.0)))
            .collect();
        Arc::new(Snapshot::new(points, CoveragePolygon::empty()))
    }

    #[tokio::test]
    async fn new_subscriber_gets_current_snapshot() {
        let query = FixedQuery::default();
        query.set(snapshot_with(2));
        let broadcaster = Broadcaster::new(query, 4);

        let mut subscription = broadcaster.subscribe();

        assert_eq!(subscription.try_recv().unwrap().revision(), 2);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber_in_order() {
        let broadcaster = Broadcaster::new(FixedQuery::default(), 8);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        for count in 1..=3 {
            assert_eq!(broadcaster.publish(snapshot_with(count)), 2);
        }

        for subscription in [&mut first, &mut second] {
            let revisions = (0..4)
                .map(|_| subscription.try_recv().unwrap().revision())
                .collect::<Vec<_>>();
            assert_eq!(revisions, vec![0, 1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn stale_snapshots_are_skipped() {
        let query = FixedQuery::default();
        query.set(snapshot_with(2));
        let broadcaster = Broadcaster::new(query, 8);
        let mut subscription = broadcaster.subscribe();

        broadcaster.publish(snapshot_with(2));
        broadcaster.publish(snapshot_with(3));

        assert_eq!(subscription.try_recv().unwrap().revision(), 2);
        assert_eq!(subscription.try_recv().unwrap().revision(), 3);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn closed_subscriber_does_not_block_others() {
        let broadcaster = Broadcaster::new(FixedQuery::default(), 8);
        let mut dead = broadcaster.subscribe();
        let mut alive = broadcaster.subscribe();
        dead.close();

        assert_eq!(broadcaster.publish(snapshot_with(1)), 1);

        assert_eq!(broadcaster.subscriber_count(), 1);
        alive.try_recv().unwrap();
        assert_eq!(alive.try_recv().unwrap().revision(), 1);
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped() {
        let broadcaster = Broadcaster::new(FixedQuery::default(), 2);
        let mut slow = broadcaster.subscribe();

        broadcaster.publish(snapshot_with(1));
        broadcaster.publish(snapshot_with(2));

        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(slow.recv().await.unwrap().revision(), 0);
        assert_eq!(slow.recv().await.unwrap().revision(), 1);
        assert!(slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let broadcaster = Broadcaster::new(FixedQuery::default(), 2);
        let subscription = broadcaster.subscribe();
        let id = subscription.id();

        broadcaster.unsubscribe(id);
        broadcaster.unsubscribe(id);
        assert_eq!(broadcaster.subscriber_count(), 0);

        drop(subscription);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let broadcaster = Broadcaster::new(FixedQuery::default(), 2);
        let subscription = broadcaster.subscribe();
        let _other = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        drop(subscription);

        assert_eq!(broadcaster.subscriber_count(), 1);
    }
}
