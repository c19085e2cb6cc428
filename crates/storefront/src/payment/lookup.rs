use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use dorsal_core::CartId;

use crate::backend::CommerceBackend;
use crate::delay::Sleeper;
use crate::medusa::Order;

/// Look up the order created from `cart_id`, up to `attempts` times with
/// `delay` between attempts.
///
/// Lookup failures count as "not there yet". No delay follows the last
/// attempt, so the worst case is `(attempts - 1) * delay` plus request time.
#[instrument(skip(backend, sleeper), fields(cart_id = %cart_id))]
pub(crate) async fn poll_order_for_cart(
    backend: &dyn CommerceBackend,
    sleeper: &dyn Sleeper,
    cart_id: &CartId,
    attempts: u32,
    delay: Duration,
) -> Option<Order> {
    for attempt in 1..=attempts {
        match backend.order_for_cart(cart_id).await {
            Ok(Some(order)) => {
                info!(order_id = %order.id, attempt, "Order found for cart");
                return Some(order);
            }
            Ok(None) => debug!(attempt, attempts, "No order for cart yet"),
            Err(e) => warn!(error = %e, attempt, attempts, "Order lookup failed"),
        }

        if attempt < attempts {
            sleeper.sleep(delay).await;
        }
    }

    None
}
