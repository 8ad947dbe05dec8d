//! Decodes CTG move bytes into board moves and weights them by the
//! game statistics of the position each move leads to, to pick a book
//! move the way the reader this format was designed for does.

use crate::basetypes::*;
use crate::board::Position;
use crate::book::signature;
use crate::book::lookup::BookEntry;
use crate::book::OpeningBook;
use crate::moves::Move;
use rand::Rng;

/// Maps a move byte to the piece glyph it moves, or `'x'` when the byte
/// never occurs in a real book (reverse-engineered placeholder).
const PIECE_CODE: &[u8; 256] = b"PNxQPQPxQBKxPBRNxxBKPBxxPxQBxBxxxRBQPxBPQQNxxPBQNQBxNxNQQQBQBxxx\
xQQxKQxxxxPQNQxxRxRxBPxxxxxxPxxPxQPQxxBKxRBxxxRQxxBxQxxxxBRRPRQR\
QRPxxNRRxxNPKxQQxxQxQxPKRRQPxQxBQxQPxRxxxRxQxRQxQPBxxRxQxBxPQQKx\
xBBBRRQPPQBPBRxPxPNNxxxQRQNPxxPKNRxRxQPQRNxPPQQRQQxNRBxNQQQQxQQx";

/// 1-based ordinal, in file-major/rank-minor scan order, of the
/// occurrence of that piece kind the byte refers to. `9` never occurs
/// in a real book and marks an impossible/malformed byte.
const PIECE_INDEX: [i8; 256] = [
    5, 2, 9, 2, 2, 1, 4, 9, 2, 2, 1, 9, 1, 1, 2, 1,
    9, 9, 1, 1, 8, 1, 9, 9, 7, 9, 2, 1, 9, 2, 9, 9,
    9, 2, 2, 2, 8, 9, 1, 3, 1, 1, 2, 9, 9, 6, 1, 1,
    2, 1, 2, 9, 1, 9, 1, 1, 2, 1, 1, 2, 1, 9, 9, 9,
    9, 2, 1, 9, 1, 1, 9, 9, 9, 9, 8, 1, 2, 2, 9, 9,
    1, 9, 1, 9, 2, 3, 9, 9, 9, 9, 9, 9, 7, 9, 9, 5,
    9, 1, 2, 2, 9, 9, 1, 1, 9, 2, 1, 0, 9, 9, 1, 2,
    9, 9, 2, 9, 1, 9, 9, 9, 9, 2, 1, 2, 3, 2, 1, 1,
    1, 1, 6, 9, 9, 1, 1, 1, 9, 9, 1, 1, 1, 9, 2, 1,
    9, 9, 2, 9, 1, 9, 2, 1, 1, 1, 1, 3, 9, 1, 9, 2,
    2, 9, 1, 8, 9, 2, 9, 9, 9, 2, 9, 2, 9, 2, 2, 9,
    2, 6, 1, 9, 9, 2, 9, 1, 9, 2, 9, 5, 2, 2, 1, 9,
    9, 1, 2, 1, 2, 2, 2, 7, 7, 2, 2, 6, 2, 1, 9, 4,
    9, 2, 2, 2, 9, 9, 9, 1, 2, 1, 1, 1, 9, 9, 5, 1,
    2, 1, 9, 2, 9, 1, 4, 1, 1, 1, 9, 4, 1, 1, 2, 1,
    2, 1, 9, 2, 2, 2, 0, 1, 2, 2, 2, 2, 9, 1, 2, 9,
];

/// Rank delta of the move (destination minus origin, modulo 8), in
/// canonical (un-flipped, un-mirrored) coordinates. `9` is impossible.
const FORWARD: [i8; 256] = [
    1, -1, 9, 0, 1, 1, 1, 9, 0, 6, -1, 9, 1, 3, 0, -1,
    9, 9, 7, 1, 1, 5, 9, 9, 1, 9, 6, 1, 9, 7, 9, 9,
    9, 0, 2, 6, 1, 9, 7, 1, 5, 0, -2, 9, 9, 1, 1, 0,
    -2, 0, 5, 9, 2, 9, 1, 4, 4, 0, 6, 5, 5, 9, 9, 9,
    9, 5, 7, 9, -1, 3, 9, 9, 9, 9, 2, 5, 2, 1, 9, 9,
    6, 9, 0, 9, 1, 1, 9, 9, 9, 9, 9, 9, 1, 9, 9, 2,
    9, 6, 2, 7, 9, 9, 3, 1, 9, 7, 4, 0, 9, 9, 0, 7,
    9, 9, 7, 9, 0, 9, 9, 9, 9, 6, 3, 6, 1, 1, 3, 0,
    6, 1, 1, 9, 9, 2, 0, 5, 9, 9, -2, 1, -1, 9, 2, 0,
    9, 9, 1, 9, 3, 9, 1, 0, 0, 4, 6, 2, 9, 2, 9, 4,
    3, 9, 2, 1, 9, 5, 9, 9, 9, 0, 9, 6, 9, 0, 3, 9,
    4, 2, 6, 9, 9, 0, 9, 5, 9, 3, 9, 1, 0, 2, 0, 9,
    9, 2, 2, 2, 0, 4, 5, 1, 2, 7, 3, 1, 5, 0, 9, 1,
    9, 1, 1, 1, 9, 9, 9, 1, 0, 2, -2, 2, 9, 9, 1, 1,
    -1, 7, 9, 3, 9, 0, 2, 4, 2, -1, 9, 1, 1, 7, 1, 0,
    0, 1, 9, 2, 2, 1, 0, 1, 0, 6, 0, 2, 9, 7, 3, 9,
];

/// File delta of the move (origin minus destination, modulo 8), in
/// canonical coordinates.
const LEFT: [i8; 256] = [
    -1, 2, 9, -2, 0, 0, 1, 9, -4, -6, 0, 9, 1, -3, -3, 2,
    9, 9, -7, 0, -1, -5, 9, 9, 0, 9, 0, 1, 9, -7, 9, 9,
    9, -7, 2, -6, 1, 9, 7, 1, -5, -6, -1, 9, 9, -1, -1, -1,
    1, -3, -5, 9, -1, 9, -2, 0, 4, -5, -6, 5, 5, 9, 9, 9,
    9, -5, 7, 9, -1, -3, 9, 9, 9, 9, 0, 5, -1, 0, 9, 9,
    0, 9, -6, 9, 1, 0, 9, 9, 9, 9, 9, 9, -1, 9, 9, 0,
    9, -6, 0, 7, 9, 9, 3, -1, 9, 0, -4, 0, 9, 9, -5, -7,
    9, 9, 7, 9, -2, 9, 9, 9, 9, 6, 0, 0, -1, 0, 3, -1,
    6, 0, 1, 9, 9, 1, -7, 0, 9, 9, -1, -1, 1, 9, 2, -7,
    9, 9, -1, 9, 0, 9, -1, 1, -3, 0, 0, 0, 9, 0, 9, 4,
    0, 9, -2, 0, 9, 0, 9, 9, 9, -2, 9, 6, 9, -4, -3, 9,
    0, 0, 6, 9, 9, -5, 9, 0, 9, -3, 9, 0, -5, 0, -1, 9,
    9, -2, -2, 2, -1, 0, 0, 1, 0, 0, 3, 0, 5, -2, 9, 0,
    9, 1, -2, 2, 9, 9, 9, 1, -6, 2, 1, 0, 9, 9, 1, 1,
    -2, 0, 9, 0, 9, -4, 0, -4, 0, -2, 9, -1, 0, -7, 1, -4,
    -7, -1, 9, 1, 0, -1, 0, 2, -1, 0, -3, -2, 9, 0, 3, 9,
];

const CASTLE_KINGSIDE_BYTE: u8 = 107;
const CASTLE_QUEENSIDE_BYTE: u8 = 246;

fn piece_from_glyph(glyph: u8) -> Option<PieceType> {
    match glyph {
        b'P' => Some(PAWN),
        b'N' => Some(KNIGHT),
        b'B' => Some(BISHOP),
        b'R' => Some(ROOK),
        b'Q' => Some(QUEEN),
        b'K' => Some(KING),
        _ => None,
    }
}

/// Finds the `nth` (1-based) square, in file-major/rank-minor scan
/// order over the canonical board, occupied by `piece` under the
/// canonical White color. Mirrors the scan order `signature::compute`
/// uses to build the position signature.
fn nth_piece_square(pos: &Position, flip: bool, mirror: bool, piece: PieceType, nth: i8) -> Option<Square> {
    if nth <= 0 {
        return None;
    }
    let mut count = 0;
    for f in 0..8 {
        for r in 0..8 {
            let canon_sq = square(f, r);
            let real_sq = signature::to_real_square(canon_sq, flip, mirror);
            let occupant = pos.squares[real_sq];
            if occupant != piece {
                continue;
            }
            let real_color = pos.colors[real_sq];
            let canon_color = if flip { opposite(real_color) } else { real_color };
            if canon_color != WHITE {
                continue;
            }
            count += 1;
            if count == nth {
                return Some(canon_sq);
            }
        }
    }
    None
}

/// Finds the unique legal move from `from` to `to`, preferring a
/// queen promotion when the move promotes (the book never records
/// which underpromotion was played).
fn squares_to_move(pos: &Position, from: Square, to: Square) -> Option<Move> {
    pos.legal_moves()
        .into_iter()
        .find(|m| m.from() == from && m.to() == to && (m.promotion() == NO_PIECE || m.promotion() == QUEEN))
}

/// Decodes a single CTG move byte into a legal move of `pos`, or
/// `None` if the byte is malformed or decodes to an illegal move --
/// both are treated as a book miss rather than a crash, since book
/// files are untrusted input.
pub fn decode_move(pos: &Position, byte: u8) -> Option<Move> {
    let flip = signature::flips_to_move(pos);
    let mirror = signature::mirrors_queenside(pos);
    let back_rank_canon: usize = if flip { 7 } else { 0 };

    if byte == CASTLE_KINGSIDE_BYTE || byte == CASTLE_QUEENSIDE_BYTE {
        let file_to = if byte == CASTLE_KINGSIDE_BYTE { 6 } else { 2 };
        let from = square(4, back_rank_canon);
        let to = square(file_to, back_rank_canon);
        return squares_to_move(pos, from, to);
    }

    let glyph = PIECE_CODE[byte as usize];
    let piece = piece_from_glyph(glyph)?;
    let nth = PIECE_INDEX[byte as usize];
    let forward = FORWARD[byte as usize];
    let left = LEFT[byte as usize];
    if nth == 9 || forward == 9 || left == 9 {
        return None;
    }

    let from_canon = nth_piece_square(pos, flip, mirror, piece, nth)?;
    let file_from = file(from_canon) as i32;
    let rank_from = rank(from_canon) as i32;
    let file_to = (file_from - left as i32).rem_euclid(8) as usize;
    let rank_to = (rank_from + forward as i32).rem_euclid(8) as usize;

    let mut rank_from = rank_from as usize;
    let mut rank_to = rank_to;
    let mut file_from = file_from as usize;
    let mut file_to = file_to;
    if flip {
        rank_from = 7 - rank_from;
        rank_to = 7 - rank_to;
    }
    if mirror {
        file_from = 7 - file_from;
        file_to = 7 - file_to;
    }

    squares_to_move(pos, square(file_from, rank_from), square(file_to, rank_to))
}

/// The weight a book entry for the position after playing `m` gives to
/// `m`, derived from that resulting position's own win/loss/draw
/// statistics and recommendation scaling. Zero if the resulting
/// position has no book entry of its own.
fn move_weight(book: &OpeningBook, pos: &Position, m: Move) -> i64 {
    let mut after = pos.clone();
    after.do_move(m);
    let entry = match book.entry_for(&after) {
        Ok(Some(entry)) => entry,
        _ => return 0,
    };

    let half_points = (2 * entry.wins + entry.draws + 1) as i64;
    let games = (entry.wins + entry.draws + entry.losses + 1) as i64;
    let mut weight = half_points * 100_000 / games;
    if entry.recommendation == 64 {
        weight = 0;
    }
    if entry.recommendation == 128 {
        weight *= 128;
    }
    weight
}

/// Chooses a move from a book entry's move list, weighted by
/// `move_weight`. Returns `None` if every candidate byte fails to
/// decode or every move carries zero weight.
pub fn pick_move(book: &OpeningBook, pos: &Position, entry: &BookEntry) -> Option<Move> {
    let mut candidates: Vec<(Move, i64)> = Vec::new();
    let mut total: i64 = 0;
    for pair in entry.moves.chunks(2) {
        let byte = pair[0];
        let m = match decode_move(pos, byte) {
            Some(m) => m,
            None => continue,
        };
        let weight = move_weight(book, pos, m);
        total += weight;
        candidates.push((m, total));
    }

    if total <= 0 {
        return None;
    }

    let choice = rand::thread_rng().gen_range(0..total);
    candidates.into_iter().find(|&(_, cumulative)| choice < cumulative).map(|(m, _)| m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_POSITION_FEN;

    #[test]
    fn test_piece_code_table_has_no_control_characters() {
        assert_eq!(PIECE_CODE.len(), 256);
        assert!(PIECE_CODE.iter().all(|&b| b == b'x' || piece_from_glyph(b).is_some()));
    }

    #[test]
    fn test_decode_kingside_castling_byte() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let m = decode_move(&pos, CASTLE_KINGSIDE_BYTE).unwrap();
        assert!(m.is_castling());
        assert_eq!(m.to(), square(6, 0));
    }

    #[test]
    fn test_decode_queenside_castling_byte_black_to_move() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1").unwrap();
        let m = decode_move(&pos, CASTLE_QUEENSIDE_BYTE).unwrap();
        assert!(m.is_castling());
        assert_eq!(m.to(), square(2, 7));
    }

    #[test]
    fn test_decode_malformed_byte_is_a_miss() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        // A byte whose tables mark it as never occurring in real data.
        assert!(decode_move(&pos, 2).is_none());
    }

    #[test]
    fn test_nth_piece_square_counts_in_file_major_order() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        // White pawns fill rank 2 entirely; scanning file-major means the
        // first pawn found is on a2, the second on b2.
        assert_eq!(nth_piece_square(&pos, false, false, PAWN, 1), Some(square(0, 1)));
        assert_eq!(nth_piece_square(&pos, false, false, PAWN, 2), Some(square(1, 1)));
    }
}
