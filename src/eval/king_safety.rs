//! King safety: pawn-shield structure plus an aggregate of pieces
//! attacking the immediate king zone. Both contributions are midgame
//! only; the endgame component is always zero, since an exposed king is
//! an asset rather than a liability once queens and rooks come off.

use crate::basetypes::*;
use crate::board::{movegen, Position};
use crate::eval::Score;

/// Bonus for an own piece of the given kind standing on a shield
/// square; king and enemy pieces (and empty squares) contribute 0.
/// Indexed by `PieceType` (`KING, QUEEN, ROOK, BISHOP, KNIGHT, PAWN`).
const SHIELD_BONUS: [i32; 6] = [0, 1, 1, 4, 2, 8];

/// Indexed by `PieceType`; king entry is unused since the attacker loop
/// skips index 0 of the piece list (the king itself).
const KING_ATTACK_SCORE: [i32; 6] = [0, 50, 30, 20, 20, 5];

/// Scales the raw attacker score by attacker count; 0 or 1 attackers
/// don't matter, counts of 6 and above are treated as fully dangerous.
const MULTIPLE_KING_ATTACK_SCALE: [i32; 16] = [
    0, 0, 512, 640, 896, 960, 1024, 1024, 1024, 1024, 1024, 1024, 1024, 1024, 1024, 1024,
];

fn shield_square(pos: &Position, sq: Square) -> Option<(Color, PieceType)> {
    let piece = pos.squares[sq];
    if piece == NO_PIECE {
        None
    } else {
        Some((pos.colors[sq], piece))
    }
}

fn shield_bonus_at(pos: &Position, side: Color, sq: Option<Square>) -> i32 {
    match sq.and_then(|s| shield_square(pos, s)) {
        Some((color, piece)) if color == side => SHIELD_BONUS[piece],
        _ => 0,
    }
}

/// Translates `sq` by `(df, dr)` files/ranks, returning `None` if the
/// result falls off the board.
fn offset(sq: Square, df: i32, dr: i32) -> Option<Square> {
    let f = file(sq) as i32 + df;
    let r = rank(sq) as i32 + dr;
    if (0..8).contains(&f) && (0..8).contains(&r) {
        Some(square(f as usize, r as usize))
    } else {
        None
    }
}

/// Scores the pawn shield in front of a (possibly hypothetical) king
/// square, per the nine weighted offsets described for this
/// component's pawn-shield contribution.
fn king_shield_score(pos: &Position, side: Color, king: Square) -> i32 {
    let push: i32 = if side == WHITE { 1 } else { -1 };
    let mut s = 0;
    s += shield_bonus_at(pos, side, offset(king, -1, 0)) * 2;
    s += shield_bonus_at(pos, side, offset(king, 1, 0)) * 2;
    s += shield_bonus_at(pos, side, offset(king, -1, push)) * 4;
    s += shield_bonus_at(pos, side, offset(king, 0, push)) * 6;
    s += shield_bonus_at(pos, side, offset(king, 1, push)) * 4;
    s += shield_bonus_at(pos, side, offset(king, -1, 2 * push)) * 1;
    s += shield_bonus_at(pos, side, offset(king, 0, 2 * push)) * 2;
    s += shield_bonus_at(pos, side, offset(king, 1, 2 * push)) * 1;
    s
}

fn castled_king_square(side: Color, kingside: bool) -> Square {
    let rank = if side == WHITE { RANK_1 } else { RANK_8 };
    square(if kingside { 6 } else { 2 }, rank)
}

/// Pawn-shield contribution to king safety, for `side`: the average of
/// the shield around the actual king square and the best shield among
/// the actual square, the post-OO square, and the post-OOO square.
fn shield_score_for(pos: &Position, side: Color) -> i32 {
    let actual = king_shield_score(pos, side, pos.king_square(side));
    let mut best = actual;
    if pos.has_oo_rights(side) {
        best = best.max(king_shield_score(pos, side, castled_king_square(side, true)));
    }
    if pos.has_ooo_rights(side) {
        best = best.max(king_shield_score(pos, side, castled_king_square(side, false)));
    }
    (actual + best) / 2
}

/// Returns whether `attacker` (of `color`, a piece of `piece` kind)
/// attacks any square in the 8-neighbourhood of `king`.
fn attacks_king_zone(pos: &Position, attacker: Square, piece: PieceType, color: Color, king: Square) -> bool {
    for dr in -1..=1 {
        for df in -1..=1 {
            if df == 0 && dr == 0 {
                continue;
            }
            if let Some(sq) = offset(king, df, dr) {
                if movegen::attacks_square(pos, attacker, piece, color, sq) {
                    return true;
                }
            }
        }
    }
    false
}

/// Attacker-aggregation contribution: pieces of `side` bearing on the
/// enemy king zone, scaled down when there's only a handful of them and
/// capped once there are enough to matter. Only counted when `side`
/// still has a queen, mirroring the source's "this is about mating
/// attacks" framing.
fn attacker_score_for(pos: &Position, side: Color) -> i32 {
    if pos.piece_count[side][QUEEN] == 0 {
        return 0;
    }
    let opp_king = pos.king_square(opposite(side));
    let mut score = 0;
    let mut num_attackers = 0;
    for &sq in pos.piece_list[side].iter().skip(1) {
        let piece = pos.squares[sq];
        if attacks_king_zone(pos, sq, piece, side, opp_king) {
            score += KING_ATTACK_SCORE[piece];
            num_attackers += 1;
        }
    }
    let n = num_attackers.min(MULTIPLE_KING_ATTACK_SCALE.len() - 1);
    score * MULTIPLE_KING_ATTACK_SCALE[n] / 1024
}

/// The full king-safety contribution for `side`, relative to the
/// opposing side, already folded into a midgame/endgame pair (endgame
/// is always 0).
pub fn evaluate(pos: &Position, side: Color) -> Score {
    let shield = shield_score_for(pos, side);
    let attackers = attacker_score_for(pos, side);
    Score::new(shield + attackers, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Position, START_POSITION_FEN};

    #[test]
    fn test_start_position_symmetric() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        assert_eq!(evaluate(&pos, WHITE), evaluate(&pos, BLACK));
    }

    #[test]
    fn test_exposed_king_scores_lower_shield() {
        let shielded = Position::from_fen("4k3/8/8/8/8/8/PPPPPPPP/4K3 w - - 0 1").unwrap();
        let exposed = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(shield_score_for(&shielded, WHITE) > shield_score_for(&exposed, WHITE));
    }

    #[test]
    fn test_black_ooo_gates_on_black_rights() {
        // Regression test for a historical copy-paste bug: Black's O-O-O
        // shield candidate must be gated on Black's own castling right,
        // not White's.
        let with_black_ooo = Position::from_fen("r3k3/pppppppp/8/8/8/8/8/4K3 b q - 0 1").unwrap();
        let without_black_ooo = Position::from_fen("r3k3/pppppppp/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        let with_score = shield_score_for(&with_black_ooo, BLACK);
        let without_score = shield_score_for(&without_black_ooo, BLACK);
        assert!(with_score >= without_score);
    }
}
