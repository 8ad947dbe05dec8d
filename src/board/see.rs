//! Static Exchange Evaluation: a minimax over the sequence of captures
//! that could occur on a single target square, used to prune losing
//! captures in quiescence search without having to actually recurse.

use crate::basetypes::*;
use crate::board::{piece_value, Position};
use crate::moves::Move;

/// A snapshot of occupancy used to simulate the capture sequence
/// without touching the real position (and without the bookkeeping
/// `do_move`/`undo_move` would otherwise require).
struct Occupancy {
    squares: [PieceType; 64],
    colors: [Color; 64],
}

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

impl Occupancy {
    fn attacks(&self, from: Square, piece: PieceType, color: Color, to: Square) -> bool {
        match piece {
            PAWN => {
                let push: i32 = if color == WHITE { 1 } else { -1 };
                try_offset(from, -1, push) == Some(to) || try_offset(from, 1, push) == Some(to)
            }
            KNIGHT => KNIGHT_DELTAS.iter().any(|&(df, dr)| try_offset(from, df, dr) == Some(to)),
            KING => KING_DELTAS.iter().any(|&(df, dr)| try_offset(from, df, dr) == Some(to)),
            BISHOP => BISHOP_DIRS.iter().any(|&d| self.slides_to(from, d, to)),
            ROOK => ROOK_DIRS.iter().any(|&d| self.slides_to(from, d, to)),
            QUEEN => BISHOP_DIRS.iter().chain(ROOK_DIRS.iter()).any(|&d| self.slides_to(from, d, to)),
            _ => false,
        }
    }

    fn slides_to(&self, from: Square, dir: (i32, i32), to: Square) -> bool {
        let mut sq = from;
        loop {
            match try_offset(sq, dir.0, dir.1) {
                Some(next) => {
                    sq = next;
                    if sq == to {
                        return true;
                    }
                    if self.squares[sq] != NO_PIECE {
                        return false;
                    }
                }
                None => return false,
            }
        }
    }

    /// Returns the least valuable piece of `color` attacking `sq`, if any.
    fn least_valuable_attacker(&self, sq: Square, color: Color) -> Option<(Square, PieceType)> {
        let mut best: Option<(Square, PieceType)> = None;
        for from in 0..64 {
            if self.squares[from] == NO_PIECE || self.colors[from] != color || from == sq {
                continue;
            }
            let piece = self.squares[from];
            if self.attacks(from, piece, color, sq) {
                if best.map_or(true, |(_, p)| piece_value(piece) < piece_value(p)) {
                    best = Some((from, piece));
                }
            }
        }
        best
    }
}

/// Evaluates the net material gain of playing `m`, assuming both sides
/// continue capturing on the destination square with their least
/// valuable piece until no profitable capture remains.
pub fn static_exchange_eval(pos: &Position, m: Move) -> i32 {
    let target = m.to();
    let mut occ = Occupancy { squares: pos.squares, colors: pos.colors };

    let mut side = pos.side_to_move;
    let from = m.from();
    let moving_piece = m.piece();

    let initial_gain = if m.is_en_passant() {
        piece_value(PAWN)
    } else {
        piece_value(occ.squares[target])
    };

    occ.squares[from] = NO_PIECE;
    if m.is_en_passant() {
        let captured_sq = square(file(target), rank(from));
        occ.squares[captured_sq] = NO_PIECE;
    }
    occ.squares[target] = moving_piece;
    occ.colors[target] = side;
    side = opposite(side);

    let mut gain = vec![initial_gain];
    loop {
        match occ.least_valuable_attacker(target, side) {
            None => break,
            Some((att_sq, att_piece)) => {
                let last = *gain.last().unwrap();
                gain.push(piece_value(occ.squares[target]) - last);
                occ.squares[att_sq] = NO_PIECE;
                occ.squares[target] = att_piece;
                occ.colors[target] = side;
                side = opposite(side);
            }
        }
    }

    for i in (0..gain.len() - 1).rev() {
        gain[i] = -(-gain[i]).max(gain[i + 1]);
    }
    gain[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    #[test]
    fn test_free_pawn_capture_is_positive() {
        let pos = Position::from_fen("4k3/8/8/8/3p4/4P3/8/4K3 w - - 0 1").unwrap();
        let m = pos.parse_move("e3d4").unwrap();
        assert!(static_exchange_eval(&pos, m) > 0);
    }

    #[test]
    fn test_losing_capture_is_negative() {
        let pos = Position::from_fen("4k3/8/8/2p1p3/3p4/8/8/3QK3 w - - 0 1").unwrap();
        let m = pos.parse_move("d1d4").unwrap();
        assert!(static_exchange_eval(&pos, m) < 0);
    }
}
