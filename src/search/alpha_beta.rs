//! The core recursive search: alpha-beta negamax with a transposition
//! table, null-move pruning, and principal-variation splitting.

use crate::moves::{Move, NO_MOVE};
use crate::search::node::SearchState;
use crate::search::quiescence::quiescence;
use crate::search::tt::{Bound, TranspositionTable, DRAW_VALUE, MATE_VALUE};
use crate::search::{NULLMOVE_DEPTH_REDUCTION, NULL_R, POLL_INTERVAL};

/// Returns whether a null move may be tried in the current position:
/// neither king may be in check, and the side to move needs more than
/// just king and pawns (otherwise null-move pruning is unsound in
/// zugzwang-prone endgames).
fn is_nullmove_allowed(state: &SearchState) -> bool {
    let pos = &state.position;
    if pos.is_check() {
        return false;
    }
    pos.has_non_pawn_material(pos.side_to_move)
}

/// Negamax search of `pos` at `ply`, within fail-hard window
/// `(alpha, beta)`, to `depth` plies. Returns the score and the best
/// continuation found (possibly empty at a terminal node).
///
/// Preserves the sign-flipping convention exactly:
/// `-search(..., -beta, -alpha, ...)`. Any deviation from this breaks
/// mate-distance semantics throughout the tree.
pub fn search(
    state: &mut SearchState,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    depth: i32,
) -> (i32, Vec<Move>) {
    if state.is_aborted() {
        return (0, Vec::new());
    }
    if alpha > MATE_VALUE - ply as i32 - 1 {
        return (alpha, Vec::new());
    }
    if depth <= 0 {
        return quiescence(state, ply, alpha, beta);
    }
    if state.position.is_draw() {
        return (DRAW_VALUE, Vec::new());
    }

    state.nodes_searched += 1;
    if state.nodes_searched & POLL_INTERVAL == 0 {
        crate::search::perform_periodic_checks(state);
        if state.is_aborted() {
            return (0, Vec::new());
        }
    }

    let full_window = beta - alpha > 1;
    let key = state.position.hash;

    if !full_window {
        if let Some(probe) = tt.probe(key, ply as i32) {
            if probe.depth >= depth {
                let cutoff = match probe.bound {
                    Bound::Exact => Some(probe.score),
                    Bound::LowerBound if probe.score >= beta => Some(beta),
                    Bound::UpperBound if probe.score <= alpha => Some(alpha),
                    _ => None,
                };
                if let Some(score) = cutoff {
                    let pv = if probe.best_move != NO_MOVE { vec![probe.best_move] } else { Vec::new() };
                    return (score, pv);
                }
            }
        }
    }

    if is_nullmove_allowed(state) {
        state.position.do_nullmove();
        let (mut score, _) = search(state, tt, ply + 1, -beta, -beta + 1, depth - NULL_R);
        score = -score;
        state.position.undo_nullmove();
        if state.is_aborted() {
            return (0, Vec::new());
        }
        if score >= beta {
            let reduced_depth = depth - NULLMOVE_DEPTH_REDUCTION;
            if reduced_depth <= 0 {
                return quiescence(state, ply, alpha, beta);
            }
            return (beta, Vec::new());
        }
    }

    let moves = state.position.generate_pseudo_moves();
    let orig_alpha = alpha;
    let mut num_legal_moves = 0;
    let mut best_pv: Vec<Move> = Vec::new();

    for m in moves {
        if !state.position.is_move_legal(m) {
            continue;
        }
        num_legal_moves += 1;

        state.position.do_move(m);
        let (score, child_pv) = if num_legal_moves == 1 {
            let (s, pv) = search(state, tt, ply + 1, -beta, -alpha, depth - 1);
            (-s, pv)
        } else {
            let (s, _) = search(state, tt, ply + 1, -alpha - 1, -alpha, depth - 1);
            let mut s = -s;
            let mut pv = Vec::new();
            if s > alpha && s < beta {
                let (s2, pv2) = search(state, tt, ply + 1, -beta, -alpha, depth - 1);
                s = -s2;
                pv = pv2;
            }
            (s, pv)
        };
        state.position.undo_move();

        if state.is_aborted() {
            return (0, Vec::new());
        }

        if score >= beta {
            tt.store(key, m, depth, beta, Bound::LowerBound, ply as i32);
            return (beta, Vec::new());
        }
        if score > alpha {
            alpha = score;
            let mut pv = vec![m];
            pv.extend(child_pv);
            best_pv = pv;
        }
    }

    if num_legal_moves == 0 {
        return if state.position.is_check() {
            (-(MATE_VALUE - ply as i32), Vec::new())
        } else {
            (DRAW_VALUE, Vec::new())
        };
    }

    let best_move = best_pv.first().copied().unwrap_or(NO_MOVE);
    if alpha > orig_alpha {
        tt.store(key, best_move, depth, alpha, Bound::Exact, ply as i32);
    } else {
        tt.store(key, best_move, depth, alpha, Bound::UpperBound, ply as i32);
    }
    (alpha, best_pv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::search::node::SearchState;
    use crate::search::SearchControl;

    #[test]
    fn test_mate_in_one() {
        let pos = Position::from_fen("4k3/R7/4K3/8/8/8/8/8 w - - 0 1").unwrap();
        let mut state = SearchState::new(pos, SearchControl::unlimited());
        let mut tt = TranspositionTable::new();
        let (score, pv) = search(&mut state, &mut tt, 0, -MATE_VALUE, MATE_VALUE, 2);
        assert_eq!(score, MATE_VALUE - 1);
        assert_eq!(pv[0].to_la_str(), "a7a8");
    }

    #[test]
    fn test_stalemate_scores_draw() {
        let pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let mut state = SearchState::new(pos, SearchControl::unlimited());
        let mut tt = TranspositionTable::new();
        let (score, _) = search(&mut state, &mut tt, 0, -MATE_VALUE, MATE_VALUE, 1);
        assert_eq!(score, DRAW_VALUE);
    }

    #[test]
    fn test_insufficient_material_draws_immediately() {
        let pos = Position::from_fen("8/8/8/8/8/6k1/8/6K1 w - - 0 1").unwrap();
        let mut state = SearchState::new(pos, SearchControl::unlimited());
        let mut tt = TranspositionTable::new();
        let (score, _) = search(&mut state, &mut tt, 0, -MATE_VALUE, MATE_VALUE, 1);
        assert_eq!(score, DRAW_VALUE);
    }

    #[test]
    fn test_search_preserves_position() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/p7/K7 w - - 0 1").unwrap();
        let before = pos.clone();
        let mut state = SearchState::new(pos, SearchControl::unlimited());
        let mut tt = TranspositionTable::new();
        let _ = search(&mut state, &mut tt, 0, -MATE_VALUE, MATE_VALUE, 4);
        assert_eq!(state.position, before);
    }

    /// Exhaustive, unpruned negamax, used only to cross-check the
    /// pruned search on positions small enough that the full tree is
    /// cheap to walk.
    fn minimax_reference_search(pos: &mut Position, depth: i32) -> i32 {
        if depth == 0 {
            return crate::eval::simple_eval(pos);
        }
        let moves: Vec<_> = pos.generate_pseudo_moves().into_iter().filter(|&m| pos.is_move_legal(m)).collect();
        if moves.is_empty() {
            return if pos.is_check() { -(MATE_VALUE - 0) } else { DRAW_VALUE };
        }
        let mut best = -MATE_VALUE - 1;
        for m in moves {
            pos.do_move(m);
            let score = -minimax_reference_search(pos, depth - 1);
            pos.undo_move();
            best = best.max(score);
        }
        best
    }

    #[test]
    fn test_alpha_beta_matches_minimax_reference_on_small_position() {
        // Kings only: no capture exists anywhere in the tree, so
        // quiescence search at the leaves always degenerates to a plain
        // stand-pat evaluation, matching the reference exactly.
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut state = SearchState::new(pos.clone(), SearchControl::unlimited());
        let mut tt = TranspositionTable::new();
        let (ab_score, _) = search(&mut state, &mut tt, 0, -MATE_VALUE, MATE_VALUE, 3);
        let mut mm_pos = pos;
        let mm_score = minimax_reference_search(&mut mm_pos, 3);
        assert_eq!(ab_score, mm_score);
    }
}
