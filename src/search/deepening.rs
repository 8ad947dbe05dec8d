//! The iterative-deepening driver: grows search depth one ply at a
//! time under a time/node/depth budget, reporting progress and picking
//! the final move.

use crate::moves::{Move, NO_MOVE};
use crate::search::node::{EngineStatus, SearchState};
use crate::search::tt::{TranspositionTable, MATE_VALUE};
use crate::search::{alpha_beta, should_deepen};

pub struct IterationReport {
    pub depth: i32,
    pub score: i32,
    pub pv: Vec<Move>,
    pub nodes: u64,
    pub time_ms: u64,
}

/// Searches the root position with iterative deepening, calling
/// `on_iteration` after every completed depth and `on_currmove` as each
/// root move begins searching. Returns the best move found (or
/// `NO_MOVE` if the position has none).
///
/// `output_delay_ms` throttles both callbacks to that minimum spacing
/// (the `Output Delay` UCI option) -- except the final iteration before
/// the search stops, which is always reported so the GUI never sees a
/// `bestmove` with no preceding `info` line.
pub fn iterative_deepen(
    state: &mut SearchState,
    tt: &mut TranspositionTable,
    output_delay_ms: u64,
    mut on_iteration: impl FnMut(&IterationReport),
    mut on_currmove: impl FnMut(Move, usize),
) -> Move {
    state.status = EngineStatus::Thinking;
    state.timer.reset();

    if state.root_moves.is_empty() {
        state.status = EngineStatus::Idle;
        return NO_MOVE;
    }

    let depth_limit = state.control.depth_limit.unwrap_or(64);
    let mut last_currmove_trace = 0u64;
    let mut last_report_trace = 0u64;

    let mut depth = 1;
    while depth <= depth_limit {
        let (score, pv) =
            root_search(state, tt, depth, output_delay_ms, &mut on_currmove, &mut last_currmove_trace);

        if state.is_aborted() && pv.is_empty() {
            break;
        }

        state.best_score = score;
        if let Some(&m) = pv.first() {
            state.best_move = m;
            state.bubble_to_front(m);
        }
        state.pv = pv.clone();

        let should_stop = state.is_aborted() || !should_deepen(state);
        let is_final = should_stop || depth == depth_limit;
        let elapsed = state.timer.elapsed_ms();
        if is_final || elapsed.saturating_sub(last_report_trace) >= output_delay_ms {
            on_iteration(&IterationReport {
                depth,
                score,
                pv,
                nodes: state.nodes_searched,
                time_ms: elapsed,
            });
            last_report_trace = elapsed;
        }

        if should_stop {
            break;
        }
        depth += 1;
    }

    state.status = EngineStatus::Idle;
    state.best_move
}

/// Searches all root moves at `depth`, behaving like the top frame of
/// `alpha_beta::search` except that it owns iteration over the root
/// move list directly (so it can report `currmove` progress and bubble
/// the best move to the front for the next iteration).
fn root_search(
    state: &mut SearchState,
    tt: &mut TranspositionTable,
    depth: i32,
    output_delay_ms: u64,
    on_currmove: &mut impl FnMut(Move, usize),
    last_currmove_trace: &mut u64,
) -> (i32, Vec<Move>) {
    let alpha_init = -MATE_VALUE - 1;
    let beta = MATE_VALUE + 1;
    let mut alpha = alpha_init;
    let mut best_pv: Vec<Move> = Vec::new();
    let root_moves = state.root_moves.clone();

    for (i, &m) in root_moves.iter().enumerate() {
        if !state.position.is_move_legal(m) {
            continue;
        }

        let elapsed = state.timer.elapsed_ms();
        if elapsed.saturating_sub(*last_currmove_trace) >= output_delay_ms {
            on_currmove(m, i + 1);
            *last_currmove_trace = elapsed;
        }

        state.position.do_move(m);
        let (score, child_pv) = if best_pv.is_empty() {
            let (s, pv) = alpha_beta::search(state, tt, 1, -beta, -alpha, depth - 1);
            (-s, pv)
        } else {
            let (s, _) = alpha_beta::search(state, tt, 1, -alpha - 1, -alpha, depth - 1);
            let mut s = -s;
            let mut pv = Vec::new();
            if s > alpha && s < beta {
                let (s2, pv2) = alpha_beta::search(state, tt, 1, -beta, -alpha, depth - 1);
                s = -s2;
                pv = pv2;
            }
            (s, pv)
        };
        state.position.undo_move();

        if state.is_aborted() {
            break;
        }

        if score > alpha {
            alpha = score;
            let mut pv = vec![m];
            pv.extend(child_pv);
            best_pv = pv;
        }
    }

    (alpha, best_pv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::search::SearchControl;

    #[test]
    fn test_finds_forced_capture() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/p7/K7 w - - 0 1").unwrap();
        let mut control = SearchControl::unlimited();
        control.depth_limit = Some(4);
        let mut state = SearchState::new(pos, control);
        let mut tt = TranspositionTable::new();
        let best = iterative_deepen(&mut state, &mut tt, 0, |_| {}, |_, _| {});
        assert_eq!(best.to_la_str(), "a1a2");
        assert!(state.best_score >= 0);
    }

    #[test]
    fn test_depth_limit_is_honored() {
        let pos = Position::from_fen("4k3/R7/4K3/8/8/8/8/8 w - - 0 1").unwrap();
        let mut control = SearchControl::unlimited();
        control.depth_limit = Some(2);
        let mut state = SearchState::new(pos, control);
        let mut tt = TranspositionTable::new();
        let mut max_depth_seen = 0;
        let best = iterative_deepen(&mut state, &mut tt, 0, |report| max_depth_seen = report.depth, |_, _| {});
        assert!(max_depth_seen <= 2);
        assert_eq!(best.to_la_str(), "a7a8");
    }

    #[test]
    fn test_output_delay_throttles_iteration_reports() {
        let pos = Position::from_fen("4k3/R7/4K3/8/8/8/8/8 w - - 0 1").unwrap();
        let mut control = SearchControl::unlimited();
        control.depth_limit = Some(4);
        let mut state = SearchState::new(pos, control);
        let mut tt = TranspositionTable::new();
        let mut report_count = 0;
        iterative_deepen(&mut state, &mut tt, 1_000_000, |_| report_count += 1, |_, _| {});
        // A huge delay still guarantees at least the final iteration is
        // reported, even though every earlier one is throttled away.
        assert_eq!(report_count, 1);
    }
}
