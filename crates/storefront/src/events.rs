//! Cart-changed notifications for observers such as a header badge.

use tokio::sync::broadcast;

use dorsal_core::CartId;

/// Something observers of the cart should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// The canonical cart changed.
    Changed { cart_id: CartId, item_count: u32 },
    /// The client no longer holds a cart (checkout finished or cart cleared).
    Cleared,
}

/// Broadcast channel of [`CartEvent`]s.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped, and slow subscribers observe `Lagged`.
#[derive(Debug, Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartEvent>,
}

impl CartEvents {
    const CAPACITY: usize = 32;

    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(Self::CAPACITY);
        Self { sender }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: CartEvent) {
        tracing::debug!(?event, "Cart event");
        // No receivers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}
