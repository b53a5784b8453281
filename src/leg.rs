//! One option contract held in a position.

use crate::types::{InstrumentToken, OptionType, OrderId};
use std::sync::atomic::{AtomicU64, Ordering};

/// A single leg of a multi-leg options position.
///
/// `current_price` is the only field mutated after construction. It lives
/// behind an `AtomicU64` holding the bit pattern of an `f64`: the tick
/// thread writes it, the same thread (and occasional status readers) read
/// it, and neither side ever takes a lock or observes a torn value.
pub struct Leg {
    pub order_id: OrderId,
    pub symbol: String,
    pub instrument_token: InstrumentToken,
    pub entry_price: f64,
    pub quantity: u32,
    pub type_tag: OptionType,
    current_price: AtomicU64,
}

impl Leg {
    /// Construct a new leg. `entry_price` seeds `current_price` so that a
    /// leg which has not yet received a tick reports its entry price rather
    /// than zero.
    ///
    /// Does not validate `entry_price` or `quantity`; rejection of invalid
    /// values happens once, in [`crate::leg_book::LegBook::add`], which
    /// returns a `LegBookError` instead of panicking.
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        instrument_token: InstrumentToken,
        entry_price: f64,
        quantity: u32,
        type_tag: OptionType,
    ) -> Self {
        Self {
            order_id,
            symbol: symbol.into(),
            instrument_token,
            entry_price,
            quantity,
            type_tag,
            current_price: AtomicU64::new(entry_price.to_bits()),
        }
    }

    #[inline(always)]
    pub fn current_price(&self) -> f64 {
        f64::from_bits(self.current_price.load(Ordering::Acquire))
    }

    #[inline(always)]
    pub fn set_current_price(&self, price: f64) {
        self.current_price.store(price.to_bits(), Ordering::Release);
    }

    /// `(current_price - entry_price) * direction_multiplier`.
    #[inline(always)]
    pub fn pnl_points(&self, direction_multiplier: f64) -> f64 {
        (self.current_price() - self.entry_price) * direction_multiplier
    }
}

impl std::fmt::Debug for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leg")
            .field("order_id", &self.order_id)
            .field("symbol", &self.symbol)
            .field("instrument_token", &self.instrument_token)
            .field("entry_price", &self.entry_price)
            .field("quantity", &self.quantity)
            .field("type_tag", &self.type_tag)
            .field("current_price", &self.current_price())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(entry: f64) -> Leg {
        Leg::new(OrderId::new(1), "NIFTY25000CE", 101, entry, 1, OptionType::Call)
    }

    #[test]
    fn current_price_starts_at_entry_price() {
        let leg = leg(100.0);
        assert_eq!(leg.current_price(), 100.0);
    }

    #[test]
    fn set_current_price_is_visible_immediately() {
        let leg = leg(100.0);
        leg.set_current_price(105.5);
        assert_eq!(leg.current_price(), 105.5);
    }

    #[test]
    fn pnl_points_applies_direction_multiplier() {
        let leg = leg(100.0);
        leg.set_current_price(104.0);
        assert_eq!(leg.pnl_points(1.0), 4.0);
        assert_eq!(leg.pnl_points(-1.0), -4.0);
    }

    #[test]
    fn new_does_not_validate_entry_price_itself() {
        // Leg::new is infallible; LegBook::add is where invalid legs are
        // rejected. See leg_book::tests::add_rejects_non_positive_entry_price.
        let leg = leg(0.0);
        assert_eq!(leg.entry_price, 0.0);
    }
}
