//! Thread-safe storage and hot-path iteration of a position's legs.

use crate::errors::LegBookError;
use crate::leg::Leg;
use crate::types::InstrumentToken;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Holds the legs of one position.
///
/// `by_symbol` and `by_token` index the same `Arc<Leg>` set; `snapshot`
/// caches a flat array of that set for hot-path iteration. Mutations
/// (`add`/`remove`) are serialized by `mutation_lock` and always rebuild and
/// publish the flat array before returning, so a reader calling
/// [`LegBook::snapshot`] concurrently observes either the pre- or
/// post-mutation array, never a partial one.
pub struct LegBook {
    by_symbol: DashMap<String, Arc<Leg>>,
    by_token: DashMap<InstrumentToken, Arc<Leg>>,
    snapshot: RwLock<Arc<Vec<Arc<Leg>>>>,
    mutation_lock: Mutex<()>,
}

impl LegBook {
    pub fn new() -> Self {
        Self {
            by_symbol: DashMap::new(),
            by_token: DashMap::new(),
            snapshot: RwLock::new(Arc::new(Vec::new())),
            mutation_lock: Mutex::new(()),
        }
    }

    /// Insert `leg`. Fails if `leg.symbol` is already present.
    pub fn add(&self, leg: Leg) -> Result<(), LegBookError> {
        if leg.entry_price <= 0.0 {
            return Err(LegBookError::NonPositiveEntryPrice {
                symbol: leg.symbol,
                entry_price: leg.entry_price,
            });
        }
        if leg.quantity == 0 {
            return Err(LegBookError::ZeroQuantity { symbol: leg.symbol });
        }

        let _guard = self.mutation_lock.lock();
        if self.by_symbol.contains_key(&leg.symbol) {
            return Err(LegBookError::DuplicateSymbol { symbol: leg.symbol });
        }

        let leg = Arc::new(leg);
        self.by_symbol.insert(leg.symbol.clone(), leg.clone());
        self.by_token.insert(leg.instrument_token, leg.clone());
        self.rebuild_snapshot();
        Ok(())
    }

    /// Remove the leg named `symbol`. Silent no-op if absent.
    pub fn remove(&self, symbol: &str) {
        let _guard = self.mutation_lock.lock();
        if let Some((_, leg)) = self.by_symbol.remove(symbol) {
            self.by_token.remove(&leg.instrument_token);
            self.rebuild_snapshot();
        }
    }

    /// O(1) lookup by instrument token, used on every tick.
    #[inline]
    pub fn get_by_token(&self, token: InstrumentToken) -> Option<Arc<Leg>> {
        self.by_token.get(&token).map(|entry| entry.value().clone())
    }

    /// Returns the currently published flat array of legs.
    #[inline]
    pub fn snapshot(&self) -> Arc<Vec<Arc<Leg>>> {
        self.snapshot.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    fn rebuild_snapshot(&self) {
        let legs: Vec<Arc<Leg>> = self.by_symbol.iter().map(|entry| entry.value().clone()).collect();
        *self.snapshot.write() = Arc::new(legs);
    }
}

impl Default for LegBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OptionType, OrderId};

    fn leg(symbol: &str, token: u64, entry: f64) -> Leg {
        Leg::new(OrderId::new(1), symbol, token, entry, 1, OptionType::Call)
    }

    #[test]
    fn add_then_lookup_by_token_and_snapshot() {
        let book = LegBook::new();
        book.add(leg("CE", 101, 100.0)).unwrap();
        book.add(leg("PE", 102, 95.0)).unwrap();

        assert_eq!(book.len(), 2);
        assert_eq!(book.get_by_token(101).unwrap().symbol, "CE");
        assert_eq!(book.snapshot().len(), 2);
    }

    #[test]
    fn add_duplicate_symbol_is_rejected() {
        let book = LegBook::new();
        book.add(leg("CE", 101, 100.0)).unwrap();
        let err = book.add(leg("CE", 102, 50.0)).unwrap_err();
        assert_eq!(
            err,
            LegBookError::DuplicateSymbol {
                symbol: "CE".to_string()
            }
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn remove_drops_from_both_maps_and_snapshot() {
        let book = LegBook::new();
        book.add(leg("CE", 101, 100.0)).unwrap();
        book.add(leg("PE", 102, 95.0)).unwrap();

        book.remove("CE");

        assert_eq!(book.len(), 1);
        assert!(book.get_by_token(101).is_none());
        assert_eq!(book.snapshot().len(), 1);
        assert_eq!(book.snapshot()[0].symbol, "PE");
    }

    #[test]
    fn remove_of_absent_symbol_is_a_silent_no_op() {
        let book = LegBook::new();
        book.add(leg("CE", 101, 100.0)).unwrap();
        book.remove("PE");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn add_rejects_non_positive_entry_price() {
        let book = LegBook::new();
        let err = book.add(leg("CE", 101, 0.0)).unwrap_err();
        assert!(matches!(err, LegBookError::NonPositiveEntryPrice { .. }));
    }
}
