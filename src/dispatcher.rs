//! Per-user fan-out from tick batches to interested `PositionMonitor`s.

use crate::monitor::PositionMonitor;
use crate::types::{ExecutionId, InstrumentToken, Tick};
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::Arc;

/// Maps instrument tokens to the monitors currently interested in them, and
/// forwards tick batches to exactly those monitors.
///
/// Stateless with respect to prices: the dispatcher only knows *who* should
/// see a tick, never the tick's value. `register`/`deregister` may run
/// concurrently with `dispatch`; `DashMap`/`DashSet`'s striped locking gives
/// the "missed on this batch, visible on the next" guarantee the design
/// calls for without an explicit generation counter.
pub struct TickDispatcher {
    monitors: DashMap<ExecutionId, Arc<PositionMonitor>>,
    token_index: DashMap<InstrumentToken, DashSet<ExecutionId>>,
}

/// Tracks which execution ids match a tick batch without allocating a set
/// for the (overwhelmingly common) single-monitor case.
enum Matched {
    None,
    One(ExecutionId),
    Many(HashSet<ExecutionId>),
}

impl TickDispatcher {
    pub fn new() -> Self {
        Self {
            monitors: DashMap::new(),
            token_index: DashMap::new(),
        }
    }

    /// Registers `monitor` under `execution_id` and indexes `tokens` so
    /// subsequent ticks on any of them reach it.
    pub fn register(&self, execution_id: ExecutionId, monitor: Arc<PositionMonitor>, tokens: &[InstrumentToken]) {
        self.monitors.insert(execution_id, monitor);
        for &token in tokens {
            self.token_index
                .entry(token)
                .or_insert_with(DashSet::new)
                .insert(execution_id);
        }
    }

    /// Removes `execution_id` from the index. Returns the tokens that now
    /// have zero interested monitors, so the caller can unsubscribe them
    /// from the upstream transport.
    pub fn deregister(&self, execution_id: ExecutionId, tokens: &[InstrumentToken]) -> Vec<InstrumentToken> {
        self.monitors.remove(&execution_id);

        let mut released = Vec::new();
        for &token in tokens {
            let now_empty = match self.token_index.get(&token) {
                Some(set) => {
                    set.remove(&execution_id);
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.token_index.remove(&token);
                released.push(token);
            }
        }
        released
    }

    /// Forwards `ticks` to every monitor that references at least one token
    /// in the batch. Each matching monitor receives the full batch — a
    /// monitor ignores tokens it does not own.
    pub fn dispatch(&self, ticks: &[Tick]) {
        match self.matching_execution_ids(ticks) {
            Matched::None => {}
            Matched::One(id) => {
                if let Some(monitor) = self.monitors.get(&id) {
                    monitor.update_prices(ticks);
                }
            }
            Matched::Many(ids) => {
                for id in ids {
                    if let Some(monitor) = self.monitors.get(&id) {
                        monitor.update_prices(ticks);
                    }
                }
            }
        }
    }

    pub fn registered_monitor_count(&self) -> usize {
        self.monitors.len()
    }

    fn matching_execution_ids(&self, ticks: &[Tick]) -> Matched {
        let mut matched = Matched::None;
        for tick in ticks {
            let Some(ids) = self.token_index.get(&tick.instrument_token) else {
                continue;
            };
            for id in ids.iter() {
                let id = *id;
                matched = match matched {
                    Matched::None => Matched::One(id),
                    Matched::One(existing) if existing == id => Matched::One(existing),
                    Matched::One(existing) => {
                        let mut set = HashSet::with_capacity(2);
                        set.insert(existing);
                        set.insert(id);
                        Matched::Many(set)
                    }
                    Matched::Many(mut set) => {
                        set.insert(id);
                        Matched::Many(set)
                    }
                };
            }
        }
        matched
    }
}

impl Default for TickDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemWallClock;
    use crate::config::{Direction, PositionMonitorConfig, SlTargetMode};
    use crate::monitor::ExitCallback;
    use crate::types::{OptionType, OrderId, UserId};
    use parking_lot::Mutex;

    fn monitor(execution_id: u64, tokens: &[(u64, &str)]) -> (Arc<PositionMonitor>, Arc<Mutex<Vec<u64>>>) {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let exits_handle = exits.clone();
        let exit_callback: ExitCallback = Arc::new(move |_user, exec, _reason| {
            exits_handle.lock().push(exec.0);
            Ok(())
        });

        let cfg = PositionMonitorConfig {
            direction: Direction::Short,
            sl_target_mode: SlTargetMode::Points,
            stop_loss_points: 1000.0,
            target_points: 1000.0,
            trailing_stop_enabled: false,
            trailing_activation_points: 0.0,
            trailing_distance_points: 0.0,
            forced_exit_enabled: false,
            forced_exit_time: None,
            forced_exit_time_zone: "Asia/Kolkata".to_string(),
            premium_based_exit_enabled: false,
            entry_premium: 0.0,
            target_decay_pct: 0.0,
            stop_loss_expansion_pct: 0.0,
            individual_leg_stop_points: None,
        };

        let monitor = Arc::new(
            PositionMonitor::new(
                ExecutionId(execution_id),
                UserId(1),
                cfg,
                Arc::new(SystemWallClock),
                exit_callback,
                None,
                None,
            )
            .unwrap(),
        );

        for (order_seq, (token, symbol)) in tokens.iter().enumerate() {
            monitor
                .add_leg(OrderId::new(order_seq as u128 + 1), *symbol, *token, 100.0, 1, OptionType::Call)
                .unwrap();
        }

        (monitor, exits)
    }

    #[test]
    fn dispatch_reaches_only_the_registered_monitor_for_its_tokens() {
        let dispatcher = TickDispatcher::new();
        let (monitor_a, _) = monitor(1, &[(101, "A1")]);
        let (monitor_b, _) = monitor(2, &[(202, "B1")]);

        dispatcher.register(ExecutionId(1), monitor_a.clone(), &[101]);
        dispatcher.register(ExecutionId(2), monitor_b.clone(), &[202]);

        dispatcher.dispatch(&[Tick::new(101, 50.0)]);

        assert_eq!(monitor_a.metrics().ticks_processed, 1);
        assert_eq!(monitor_b.metrics().ticks_processed, 0);
    }

    #[test]
    fn dispatch_reaches_multiple_monitors_sharing_a_batch() {
        let dispatcher = TickDispatcher::new();
        let (monitor_a, _) = monitor(1, &[(101, "A1")]);
        let (monitor_b, _) = monitor(2, &[(202, "B1")]);

        dispatcher.register(ExecutionId(1), monitor_a.clone(), &[101]);
        dispatcher.register(ExecutionId(2), monitor_b.clone(), &[202]);

        dispatcher.dispatch(&[Tick::new(101, 50.0), Tick::new(202, 60.0)]);

        assert_eq!(monitor_a.metrics().ticks_processed, 1);
        assert_eq!(monitor_b.metrics().ticks_processed, 1);
    }

    #[test]
    fn deregister_returns_tokens_with_no_remaining_interest() {
        let dispatcher = TickDispatcher::new();
        let (monitor_a, _) = monitor(1, &[(101, "A1")]);

        dispatcher.register(ExecutionId(1), monitor_a, &[101]);
        let released = dispatcher.deregister(ExecutionId(1), &[101]);

        assert_eq!(released, vec![101]);
        dispatcher.dispatch(&[Tick::new(101, 999.0)]); // no-op, monitor gone
    }

    #[test]
    fn deregister_keeps_token_alive_while_another_monitor_still_wants_it() {
        let dispatcher = TickDispatcher::new();
        let (monitor_a, _) = monitor(1, &[(101, "A1")]);
        let (monitor_b, _) = monitor(2, &[(101, "B1")]);

        dispatcher.register(ExecutionId(1), monitor_a, &[101]);
        dispatcher.register(ExecutionId(2), monitor_b.clone(), &[101]);

        let released = dispatcher.deregister(ExecutionId(1), &[101]);
        assert!(released.is_empty());

        dispatcher.dispatch(&[Tick::new(101, 50.0)]);
        assert_eq!(monitor_b.metrics().ticks_processed, 1);
    }

    #[test]
    fn dispatch_of_an_unknown_token_is_a_silent_no_op() {
        let dispatcher = TickDispatcher::new();
        dispatcher.dispatch(&[Tick::new(999, 1.0)]); // must not panic
    }
}
