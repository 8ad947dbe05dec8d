//! Search: iterative deepening over alpha-beta negamax, with a
//! transposition table, null-move pruning, and a quiescence extension
//! at the leaves.

pub mod alpha_beta;
pub mod deepening;
pub mod node;
pub mod quiescence;
pub mod timer;
pub mod tt;

use node::SearchState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Node-count mask controlling how often the search polls for input and
/// checks the clock; a power of two minus one, per the source this
/// engine's protocol loop is modeled on.
pub const POLL_INTERVAL: u64 = 0xffff;

pub const NULL_R: i32 = 4;

/// Further depth reduction applied after a null-move search fails
/// high, on top of the `NULL_R` reduction already used for the
/// verification search itself.
pub const NULLMOVE_DEPTH_REDUCTION: i32 = 4;

/// Stopping conditions for one search invocation. Constructed by the
/// protocol layer from a `go` command's subflags. `abort_signal`, when
/// present, is flipped by the protocol loop's input thread on `stop` or
/// `quit` and observed cooperatively at the next poll.
#[derive(Clone, Default)]
pub struct SearchControl {
    pub depth_limit: Option<i32>,
    pub node_limit: Option<u64>,
    pub time_target_ms: Option<u64>,
    pub time_limit_ms: Option<u64>,
    pub infinite: bool,
    pub abort_signal: Option<Arc<AtomicBool>>,
}

impl SearchControl {
    pub fn unlimited() -> SearchControl {
        SearchControl { infinite: true, ..Default::default() }
    }
}

fn should_stop_searching(state: &SearchState) -> bool {
    if state.status == node::EngineStatus::Aborted {
        return true;
    }
    if let Some(signal) = &state.control.abort_signal {
        if signal.load(Ordering::Relaxed) {
            return true;
        }
    }
    let control = &state.control;
    if !control.infinite {
        if let Some(target) = control.time_target_ms {
            if state.timer.elapsed_ms() >= target {
                return true;
            }
        }
    }
    if let Some(limit) = control.node_limit {
        if state.nodes_searched >= limit {
            return true;
        }
    }
    false
}

/// True once we're more than halfway through the time budget for this
/// move, meaning another iteration almost certainly won't finish.
pub fn should_deepen(state: &SearchState) -> bool {
    if should_stop_searching(state) {
        return false;
    }
    let control = &state.control;
    if !control.infinite {
        if let Some(target) = control.time_target_ms {
            let remaining = target.saturating_sub(state.timer.elapsed_ms());
            if remaining < target / 2 {
                return false;
            }
        }
    }
    true
}

/// Runs the periodic input/clock poll every `POLL_INTERVAL` nodes, and
/// sets `state.status` to `Aborted` if a stop condition is met.
pub fn perform_periodic_checks(state: &mut SearchState) {
    if should_stop_searching(state) {
        state.status = node::EngineStatus::Aborted;
    }
}
