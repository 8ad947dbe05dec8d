//! Pseudo-legal move generation and attack detection on the mailbox
//! board. "Pseudo-legal" here means every chess rule is respected
//! except that the mover's own king may be left in check; callers
//! filter with `Position::is_move_legal`.

use crate::basetypes::*;
use crate::board::Position;
use crate::moves::Move;

const BISHOP_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const KNIGHT_DELTAS: [(i32, i32); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];
const KING_DELTAS: [(i32, i32); 8] = [
    (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1),
];

fn try_offset(sq: Square, df: i32, dr: i32) -> Option<Square> {
    let f = file(sq) as i32 + df;
    let r = rank(sq) as i32 + dr;
    if (0..8).contains(&f) && (0..8).contains(&r) {
        Some(square(f as usize, r as usize))
    } else {
        None
    }
}

/// Returns whether a piece of `piece`/`color` on `from` attacks `to`,
/// pseudo-legally (sliding pieces are blocked by any occupant).
pub fn attacks_square(pos: &Position, from: Square, piece: PieceType, color: Color, to: Square) -> bool {
    match piece {
        PAWN => {
            let push: i32 = if color == WHITE { 1 } else { -1 };
            try_offset(from, -1, push) == Some(to) || try_offset(from, 1, push) == Some(to)
        }
        KNIGHT => KNIGHT_DELTAS.iter().any(|&(df, dr)| try_offset(from, df, dr) == Some(to)),
        KING => KING_DELTAS.iter().any(|&(df, dr)| try_offset(from, df, dr) == Some(to)),
        BISHOP => BISHOP_DIRS.iter().any(|&d| slides_to(pos, from, d, to)),
        ROOK => ROOK_DIRS.iter().any(|&d| slides_to(pos, from, d, to)),
        QUEEN => BISHOP_DIRS.iter().chain(ROOK_DIRS.iter()).any(|&d| slides_to(pos, from, d, to)),
        _ => false,
    }
}

fn slides_to(pos: &Position, from: Square, dir: (i32, i32), to: Square) -> bool {
    let mut sq = from;
    loop {
        match try_offset(sq, dir.0, dir.1) {
            Some(next) => {
                sq = next;
                if sq == to {
                    return true;
                }
                if pos.squares[sq] != NO_PIECE {
                    return false;
                }
            }
            None => return false,
        }
    }
}

fn add_slides(pos: &Position, from: Square, dirs: &[(i32, i32)], captures_only: bool, out: &mut Vec<Move>) {
    let us = pos.side_to_move;
    let piece = pos.squares[from];
    for &dir in dirs {
        let mut sq = from;
        loop {
            match try_offset(sq, dir.0, dir.1) {
                Some(next) => {
                    sq = next;
                    if pos.squares[sq] == NO_PIECE {
                        if !captures_only {
                            out.push(Move::new(from, sq, piece, NO_PIECE, NO_PIECE, false, false, false));
                        }
                    } else {
                        if pos.colors[sq] != us {
                            out.push(Move::new(from, sq, piece, pos.squares[sq], NO_PIECE, false, false, false));
                        }
                        break;
                    }
                }
                None => break,
            }
        }
    }
}

fn add_steps(pos: &Position, from: Square, deltas: &[(i32, i32)], captures_only: bool, out: &mut Vec<Move>) {
    let us = pos.side_to_move;
    let piece = pos.squares[from];
    for &(df, dr) in deltas {
        if let Some(to) = try_offset(from, df, dr) {
            if pos.squares[to] == NO_PIECE {
                if !captures_only {
                    out.push(Move::new(from, to, piece, NO_PIECE, NO_PIECE, false, false, false));
                }
            } else if pos.colors[to] != us {
                out.push(Move::new(from, to, piece, pos.squares[to], NO_PIECE, false, false, false));
            }
        }
    }
}

fn add_pawn_moves(pos: &Position, from: Square, captures_only: bool, out: &mut Vec<Move>) {
    let us = pos.side_to_move;
    let them = opposite(us);
    let push: i32 = if us == WHITE { 1 } else { -1 };
    let start_rank = if us == WHITE { RANK_2 } else { 6 };
    let last_rank = if us == WHITE { RANK_8 } else { RANK_1 };

    let push_one = try_offset(from, 0, push);
    if let Some(to) = push_one {
        if pos.squares[to] == NO_PIECE {
            if !captures_only {
                add_pawn_advance(from, to, rank(to) == last_rank, out);
            }
            if rank(from) == start_rank {
                if let Some(to2) = try_offset(from, 0, 2 * push) {
                    if pos.squares[to2] == NO_PIECE && !captures_only {
                        out.push(Move::new(from, to2, PAWN, NO_PIECE, NO_PIECE, false, false, true));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        if let Some(to) = try_offset(from, df, push) {
            if pos.squares[to] != NO_PIECE && pos.colors[to] == them {
                add_pawn_capture(from, to, pos.squares[to], rank(to) == last_rank, out);
            } else if Some(to) == pos.ep_square {
                out.push(Move::new(from, to, PAWN, PAWN, NO_PIECE, false, true, false));
            }
        }
    }
}

fn add_pawn_advance(from: Square, to: Square, promotes: bool, out: &mut Vec<Move>) {
    if promotes {
        for &p in &[QUEEN, ROOK, BISHOP, KNIGHT] {
            out.push(Move::new(from, to, PAWN, NO_PIECE, p, false, false, false));
        }
    } else {
        out.push(Move::new(from, to, PAWN, NO_PIECE, NO_PIECE, false, false, false));
    }
}

fn add_pawn_capture(from: Square, to: Square, captured: PieceType, promotes: bool, out: &mut Vec<Move>) {
    if promotes {
        for &p in &[QUEEN, ROOK, BISHOP, KNIGHT] {
            out.push(Move::new(from, to, PAWN, captured, p, false, false, false));
        }
    } else {
        out.push(Move::new(from, to, PAWN, captured, NO_PIECE, false, false, false));
    }
}

fn add_castling_moves(pos: &Position, out: &mut Vec<Move>) {
    let us = pos.side_to_move;
    let them = opposite(us);
    let back_rank = if us == WHITE { RANK_1 } else { RANK_8 };
    let king = pos.king_square(us);
    if pos.is_square_attacked(king, them) {
        return;
    }
    if pos.has_oo_rights(us) {
        let f = square(5, back_rank);
        let g = square(6, back_rank);
        if pos.squares[f] == NO_PIECE
            && pos.squares[g] == NO_PIECE
            && !pos.is_square_attacked(f, them)
            && !pos.is_square_attacked(g, them)
        {
            out.push(Move::new(king, g, KING, NO_PIECE, NO_PIECE, true, false, false));
        }
    }
    if pos.has_ooo_rights(us) {
        let d = square(3, back_rank);
        let c = square(2, back_rank);
        let b = square(1, back_rank);
        if pos.squares[d] == NO_PIECE
            && pos.squares[c] == NO_PIECE
            && pos.squares[b] == NO_PIECE
            && !pos.is_square_attacked(d, them)
            && !pos.is_square_attacked(c, them)
        {
            out.push(Move::new(king, c, KING, NO_PIECE, NO_PIECE, true, false, false));
        }
    }
}

/// Generates pseudo-legal moves for the side to move. When
/// `captures_only` is set, only captures and promotions are produced
/// (castling and quiet pawn pushes are skipped), for quiescence search.
pub fn generate_pseudo_moves(pos: &Position, captures_only: bool) -> Vec<Move> {
    let us = pos.side_to_move;
    let mut out = Vec::with_capacity(48);
    for &from in pos.piece_list[us].iter() {
        match pos.squares[from] {
            PAWN => add_pawn_moves(pos, from, captures_only, &mut out),
            KNIGHT => add_steps(pos, from, &KNIGHT_DELTAS, captures_only, &mut out),
            KING => add_steps(pos, from, &KING_DELTAS, captures_only, &mut out),
            BISHOP => add_slides(pos, from, &BISHOP_DIRS, captures_only, &mut out),
            ROOK => add_slides(pos, from, &ROOK_DIRS, captures_only, &mut out),
            QUEEN => {
                add_slides(pos, from, &BISHOP_DIRS, captures_only, &mut out);
                add_slides(pos, from, &ROOK_DIRS, captures_only, &mut out);
            }
            _ => unreachable!("piece list entry with no piece on the board"),
        }
    }
    if !captures_only {
        add_castling_moves(pos, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Position, START_POSITION_FEN};

    #[test]
    fn test_start_position_move_count() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        assert_eq!(pos.generate_legal_moves().len(), 20);
    }

    #[test]
    fn test_castling_generated_when_clear() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let moves = pos.generate_legal_moves();
        assert!(moves.iter().any(|m| m.is_castling() && m.to() == square(6, RANK_1)));
        assert!(moves.iter().any(|m| m.is_castling() && m.to() == square(2, RANK_1)));
    }

    #[test]
    fn test_en_passant_capture_generated() {
        let pos = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let moves = pos.generate_legal_moves();
        assert!(moves.iter().any(|m| m.is_en_passant()));
    }

    #[test]
    fn test_promotion_generates_four_moves() {
        let pos = Position::from_fen("4k3/4P3/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let promos: Vec<_> = pos.generate_legal_moves().into_iter().filter(|m| m.is_promotion()).collect();
        assert_eq!(promos.len(), 4);
    }
}
