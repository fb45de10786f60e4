//! Process-wide notification hub
//!
//! A registry of named broadcast channels. Publishing never blocks and never
//! fails: a channel with no subscribers simply drops the event, and a slow
//! subscriber lags (loses the oldest buffered events) instead of holding up
//! the publisher. Within one channel, delivery order matches publish order.

use futures::Stream;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use super::{ApplicationEvent, ChannelKey};

/// Registry of notification channels, cheap to clone
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    channels: RwLock<HashMap<ChannelKey, broadcast::Sender<ApplicationEvent>>>,
    capacity: usize,
}

impl NotificationHub {
    /// Creates a hub whose channels buffer `capacity` events each
    ///
    /// # Examples
    ///
    /// ```
    /// use hire_common::events::{ChannelKey, NotificationHub};
    ///
    /// let hub = NotificationHub::new(64);
    /// let _rx = hub.subscribe(ChannelKey::Global);
    /// assert_eq!(hub.subscriber_count(ChannelKey::Global), 1);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: RwLock::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Subscribe to all future events on a channel
    ///
    /// The channel is created on first subscription. Dropping the returned
    /// [`Subscription`] unsubscribes, and removes the channel once its last
    /// subscriber is gone.
    pub fn subscribe(&self, key: ChannelKey) -> Subscription {
        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let capacity = self.inner.capacity;
        let rx = channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();

        debug!(channel = %key, "Notification subscriber added");
        Subscription {
            rx,
            release: Release {
                key,
                hub: Arc::downgrade(&self.inner),
            },
        }
    }

    /// Publish an event to every channel it routes to
    ///
    /// Returns the number of subscriber deliveries queued across all channels.
    pub fn publish(&self, event: ApplicationEvent) -> usize {
        let routes = event.routes();
        let mut delivered = 0;
        let mut abandoned = Vec::new();

        {
            let channels = self
                .inner
                .channels
                .read()
                .unwrap_or_else(PoisonError::into_inner);

            for key in &routes {
                if let Some(tx) = channels.get(key) {
                    match tx.send(event.clone()) {
                        Ok(count) => delivered += count,
                        Err(_) => abandoned.push(*key),
                    }
                }
            }
        }

        if !abandoned.is_empty() {
            self.prune(&abandoned);
        }

        debug!(
            event = event.event_type(),
            application_id = %event.application_id(),
            channels = routes.len(),
            delivered,
            "Published application event"
        );

        delivered
    }

    /// Drop channels among `keys` that have no remaining subscribers
    fn prune(&self, keys: &[ChannelKey]) {
        self.inner.prune(keys);
    }

    /// Current number of subscribers on a channel
    pub fn subscriber_count(&self, key: ChannelKey) -> usize {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of channels currently registered
    pub fn channel_count(&self) -> usize {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Configured per-channel buffer capacity
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl HubInner {
    fn prune(&self, keys: &[ChannelKey]) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for key in keys {
            // Re-checked under the write lock: a subscriber may have joined since
            if channels.get(key).is_some_and(|tx| tx.receiver_count() == 0) {
                channels.remove(key);
                debug!(channel = %key, "Removed idle notification channel");
            }
        }
    }
}

/// A live subscription to one hub channel
///
/// Derefs to the underlying [`broadcast::Receiver`].
pub struct Subscription {
    // Field order matters: the receiver must drop before `release` runs
    rx: broadcast::Receiver<ApplicationEvent>,
    release: Release,
}

impl Subscription {
    /// Channel this subscription listens on
    pub fn key(&self) -> ChannelKey {
        self.release.key
    }

    /// Convert into a `Stream`, keeping the channel registered while it lives
    pub fn into_stream(self) -> SubscriptionStream {
        let Subscription { rx, release } = self;
        SubscriptionStream {
            inner: BroadcastStream::new(rx),
            _release: release,
        }
    }
}

impl Deref for Subscription {
    type Target = broadcast::Receiver<ApplicationEvent>;

    fn deref(&self) -> &Self::Target {
        &self.rx
    }
}

impl DerefMut for Subscription {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.rx
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.release.key)
            .finish()
    }
}

/// Event stream of a [`Subscription`]; lagging surfaces as an `Err` item
pub struct SubscriptionStream {
    inner: BroadcastStream<ApplicationEvent>,
    _release: Release,
}

impl Stream for SubscriptionStream {
    type Item = Result<ApplicationEvent, BroadcastStreamRecvError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Prunes its channel on drop if no subscriber is left
struct Release {
    key: ChannelKey,
    hub: Weak<HubInner>,
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.prune(&[self.key]);
        }
    }
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("channels", &self.channel_count())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}
