//! Quiescence search: extends the leaves of the main search through
//! captures until the position is "quiet" enough for the static
//! evaluator to be trusted.

use crate::eval::simple_eval;
use crate::moves::Move;
use crate::search::node::SearchState;
use crate::search::tt::{DRAW_VALUE, MATE_VALUE};
use crate::search::POLL_INTERVAL;

/// Runs quiescence search at `ply` within window `(alpha, beta)`,
/// returning the fail-hard score and the best continuation found (the
/// principal variation from this ply onward, possibly empty).
///
/// A well-known limitation, inherited rather than fixed here: a
/// position where the side to move is in check still takes the
/// stand-pat evaluation as a floor, even though evasions shouldn't
/// really be skippable. See the design notes for the open question.
pub fn quiescence(state: &mut SearchState, ply: usize, mut alpha: i32, beta: i32) -> (i32, Vec<Move>) {
    if state.is_aborted() {
        return (0, Vec::new());
    }
    state.nodes_searched += 1;
    if state.nodes_searched & POLL_INTERVAL == 0 {
        crate::search::perform_periodic_checks(state);
        if state.is_aborted() {
            return (0, Vec::new());
        }
    }

    let stand_pat = simple_eval(&state.position);
    if stand_pat >= beta {
        return (beta, Vec::new());
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut best_pv = Vec::new();
    let mut tried_any = false;

    for m in state.position.generate_pseudo_captures() {
        if !state.position.is_move_legal(m) {
            continue;
        }
        if state.position.static_exchange_eval(m) < 0 {
            continue;
        }
        tried_any = true;
        state.position.do_move(m);
        let (mut score, child_pv) = quiescence(state, ply + 1, -beta, -alpha);
        score = -score;
        state.position.undo_move();

        if state.is_aborted() {
            return (0, Vec::new());
        }
        if score >= beta {
            return (beta, Vec::new());
        }
        if score > alpha {
            alpha = score;
            let mut pv = vec![m];
            pv.extend(child_pv);
            best_pv = pv;
        }
    }

    if !tried_any {
        if !state.position.generate_legal_noncaptures().is_empty() {
            return (stand_pat, Vec::new());
        }
        return if state.position.is_check() {
            (-(MATE_VALUE - ply as i32), Vec::new())
        } else {
            (DRAW_VALUE, Vec::new())
        };
    }

    (alpha, best_pv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::search::SearchControl;

    #[test]
    fn test_quiet_position_returns_stand_pat() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut state = SearchState::new(pos, SearchControl::unlimited());
        let (score, _) = quiescence(&mut state, 0, -MATE_VALUE, MATE_VALUE);
        assert_eq!(score, simple_eval(&state.position));
    }

    #[test]
    fn test_free_capture_improves_score() {
        let pos = Position::from_fen("4k3/8/8/8/3p4/4P3/8/4K3 w - - 0 1").unwrap();
        let mut state = SearchState::new(pos, SearchControl::unlimited());
        let (score, pv) = quiescence(&mut state, 0, -MATE_VALUE, MATE_VALUE);
        assert!(score > 0);
        assert!(!pv.is_empty());
    }
}
