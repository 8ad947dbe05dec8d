//! The board representation: an 8x8 mailbox of piece codes, side to
//! move, castling rights, en-passant target, per-side piece lists (king
//! always at index 0), piece counts, a Zobrist-style hash key, and
//! material/piece-square-table accumulators.
//!
//! `Position` is the single owner of all board state. It is mutated only
//! through `do_move`/`undo_move` pairs that are exact inverses of each
//! other on every observable attribute.

pub mod fen;
pub mod movegen;
pub mod see;
pub mod zobrist;

use crate::basetypes::*;
use crate::eval::Score;
use crate::moves::Move;
use zobrist::ZOBRIST;

pub const WHITE_OO: u8 = 1;
pub const WHITE_OOO: u8 = 2;
pub const BLACK_OO: u8 = 4;
pub const BLACK_OOO: u8 = 8;

#[inline]
pub fn oo_right(color: Color) -> u8 {
    if color == WHITE {
        WHITE_OO
    } else {
        BLACK_OO
    }
}

#[inline]
pub fn ooo_right(color: Color) -> u8 {
    if color == WHITE {
        WHITE_OOO
    } else {
        BLACK_OOO
    }
}

/// Material value of a piece kind, in centipawns. Used for the
/// null-move "more than king and pawns" test, insufficient-material
/// draw detection, and static exchange evaluation.
pub fn piece_value(piece: PieceType) -> i32 {
    match piece {
        KING => 20000,
        QUEEN => 975,
        ROOK => 500,
        BISHOP => 325,
        KNIGHT => 325,
        PAWN => 100,
        _ => 0,
    }
}

/// One entry of the undo stack: everything needed to exactly reverse a
/// `do_move` call that isn't already recoverable from the move itself.
#[derive(Clone, Copy)]
struct UndoInfo {
    mv: Move,
    captured_square: Square,
    /// Index the captured piece held in `piece_list[them]` at the
    /// moment it was removed; meaningless unless `mv` is a capture.
    captured_idx: usize,
    /// Index the pawn held in `piece_list[us]` at the moment it was
    /// removed for promotion; meaningless unless `mv` is a promotion.
    promo_idx: usize,
    old_castling_rights: u8,
    old_ep_square: Option<Square>,
    old_halfmove_clock: u8,
    old_hash: u64,
}

#[derive(Clone)]
pub struct Position {
    pub squares: [PieceType; 64],
    pub colors: [Color; 64],
    pub side_to_move: Color,
    pub castling_rights: u8,
    pub ep_square: Option<Square>,
    /// Per-side piece location lists; the king is always at index 0.
    pub piece_list: [Vec<Square>; 2],
    pub piece_count: [[usize; 6]; 2],
    pub hash: u64,
    pub material: [i32; 2],
    pub psqt: [Score; 2],
    pub halfmove_clock: u8,
    pub fullmove_number: u32,
    history: Vec<u64>,
    undo_stack: Vec<UndoInfo>,
}

pub const START_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Position {
    /// Creates the position from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Position, crate::error::FenError> {
        fen::parse_fen(fen)
    }

    /// Returns the position at entry, after applying the given moves in
    /// long algebraic notation (used for the UCI `position ... moves
    /// ...` command and for `SearchNode::from_history`-style setup).
    pub fn from_history(fen: &str, moves: &[String]) -> Result<Position, crate::error::FenError> {
        let mut pos = Position::from_fen(fen)?;
        for mv_str in moves {
            let mv = pos
                .parse_move(mv_str)
                .ok_or_else(|| crate::error::FenError(format!("illegal move in history: {}", mv_str)))?;
            pos.do_move(mv);
        }
        Ok(pos)
    }

    /// Parses a long-algebraic move string (`e2e4`, `e7e8q`) into a
    /// `Move`, using the engine's own legal-move generator so that only
    /// legal moves are accepted.
    pub fn parse_move(&self, s: &str) -> Option<Move> {
        let s = s.trim();
        if s.len() < 4 {
            return None;
        }
        let from = parse_square(&s[0..2])?;
        let to = parse_square(&s[2..4])?;
        let promotion = match s.as_bytes().get(4) {
            Some(b'q') => QUEEN,
            Some(b'r') => ROOK,
            Some(b'b') => BISHOP,
            Some(b'n') => KNIGHT,
            _ => NO_PIECE,
        };
        self.legal_moves()
            .into_iter()
            .find(|m| m.from() == from && m.to() == to && m.promotion() == promotion)
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.piece_list[color][0]
    }

    #[inline]
    pub fn has_oo_rights(&self, color: Color) -> bool {
        self.castling_rights & oo_right(color) != 0
    }

    #[inline]
    pub fn has_ooo_rights(&self, color: Color) -> bool {
        self.castling_rights & ooo_right(color) != 0
    }

    /// Returns whether `side`'s king is in check.
    pub fn is_check(&self) -> bool {
        self.is_square_attacked(self.king_square(self.side_to_move), opposite(self.side_to_move))
    }

    pub fn is_square_attacked_by(&self, sq: Square, color: Color) -> bool {
        self.is_square_attacked(sq, color)
    }

    /// Returns whether `sq` is attacked by any piece of `by_color`.
    pub fn is_square_attacked(&self, sq: Square, by_color: Color) -> bool {
        for &from in self.piece_list[by_color].iter() {
            let piece = self.squares[from];
            if movegen::attacks_square(self, from, piece, by_color, sq) {
                return true;
            }
        }
        false
    }

    /// Returns whether the position is a draw by the 50-move rule,
    /// threefold repetition, or insufficient material. Per this
    /// engine's repetition convention, a position is treated as a draw
    /// after the *first* repetition (not the usual second), and a
    /// freshly constructed position is never considered drawn.
    pub fn is_draw(&self) -> bool {
        if self.halfmove_clock >= 100 {
            return true;
        }
        if self.is_repetition() {
            return true;
        }
        self.has_insufficient_material()
    }

    fn is_repetition(&self) -> bool {
        let limit = self.halfmove_clock as usize;
        self.history
            .iter()
            .rev()
            .take(limit)
            .any(|&k| k == self.hash)
    }

    fn has_insufficient_material(&self) -> bool {
        let total_non_king = self.piece_list[WHITE].len() + self.piece_list[BLACK].len() - 2;
        if total_non_king == 0 {
            return true;
        }
        if total_non_king == 1 {
            let minor_only = |color: Color| {
                self.piece_count[color][KNIGHT] + self.piece_count[color][BISHOP] == 1
                    && self.piece_count[color][QUEEN] == 0
                    && self.piece_count[color][ROOK] == 0
                    && self.piece_count[color][PAWN] == 0
            };
            return (minor_only(WHITE) && self.piece_list[BLACK].len() == 1)
                || (minor_only(BLACK) && self.piece_list[WHITE].len() == 1);
        }
        false
    }

    /// Returns whether the side to move has material beyond king and
    /// pawns -- the standard guard against null-move pruning in
    /// zugzwang-prone endgames.
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        PIECE_TYPES
            .iter()
            .filter(|&&p| p != KING && p != PAWN)
            .any(|&p| self.piece_count[color][p] > 0)
    }

    fn add_piece(&mut self, color: Color, piece: PieceType, sq: Square) {
        self.squares[sq] = piece;
        self.colors[sq] = color;
        if piece == KING {
            self.piece_list[color][0] = sq;
        } else {
            self.piece_list[color].push(sq);
        }
        self.piece_count[color][piece] += 1;
        self.material[color] += piece_value(piece);
        self.psqt[color] = self.psqt[color] + crate::eval::psqt::value(color, piece, sq);
        self.hash ^= ZOBRIST.piece(color, piece, sq);
    }

    /// Removes the piece on `sq`, updating every accumulator. Returns
    /// the index it occupied in `piece_list[color]` just before removal
    /// (via `Vec::swap_remove`, so the list's tail moved into that slot);
    /// callers that need to restore the piece later must remember this
    /// index and use `restore_piece_at_index` rather than pushing it
    /// back onto the end, or the list's order will drift from a plain
    /// capture/promotion round trip. Meaningless (always 0) for a king,
    /// which is never removed through this path.
    fn remove_piece(&mut self, color: Color, sq: Square) -> usize {
        let piece = self.squares[sq];
        self.squares[sq] = NO_PIECE;
        let idx = if piece != KING {
            let list = &mut self.piece_list[color];
            let idx = list.iter().position(|&s| s == sq).expect("piece list out of sync");
            list.swap_remove(idx);
            idx
        } else {
            0
        };
        self.piece_count[color][piece] -= 1;
        self.material[color] -= piece_value(piece);
        self.psqt[color] = self.psqt[color] - crate::eval::psqt::value(color, piece, sq);
        self.hash ^= ZOBRIST.piece(color, piece, sq);
        idx
    }

    /// Re-adds a piece previously taken off the board by `remove_piece`
    /// at index `idx`, restoring `piece_list[color]` to the exact order
    /// it held before that removal (inverting the `swap_remove`) as well
    /// as every other accumulator `remove_piece` touched.
    fn restore_piece_at_index(&mut self, color: Color, piece: PieceType, sq: Square, idx: usize) {
        self.squares[sq] = piece;
        self.colors[sq] = color;
        let list = &mut self.piece_list[color];
        list.push(sq);
        let last = list.len() - 1;
        list.swap(idx, last);
        self.piece_count[color][piece] += 1;
        self.material[color] += piece_value(piece);
        self.psqt[color] = self.psqt[color] + crate::eval::psqt::value(color, piece, sq);
        self.hash ^= ZOBRIST.piece(color, piece, sq);
    }

    /// Moves the piece on `from` to `to` in place: unlike
    /// `remove_piece`+`add_piece`, this updates `piece_list` at whatever
    /// index the piece already occupies instead of moving it to the
    /// list's tail, so a move's own piece never changes position in its
    /// side's piece list -- mirroring `relocate_piece_raw`'s in-place
    /// update, plus the hash/psqt bookkeeping `relocate_piece_raw` skips
    /// (material is unaffected; the same piece just changes square).
    fn relocate_piece(&mut self, color: Color, from: Square, to: Square) {
        let piece = self.squares[from];
        self.squares[from] = NO_PIECE;
        self.squares[to] = piece;
        self.colors[to] = color;
        if piece == KING {
            self.piece_list[color][0] = to;
        } else {
            let idx = self.piece_list[color]
                .iter()
                .position(|&s| s == from)
                .expect("piece list out of sync");
            self.piece_list[color][idx] = to;
        }
        self.psqt[color] =
            self.psqt[color] - crate::eval::psqt::value(color, piece, from) + crate::eval::psqt::value(color, piece, to);
        self.hash ^= ZOBRIST.piece(color, piece, from);
        self.hash ^= ZOBRIST.piece(color, piece, to);
    }

    fn set_castling_rights(&mut self, new_rights: u8) {
        self.hash ^= ZOBRIST.castling[self.castling_rights as usize];
        self.castling_rights = new_rights;
        self.hash ^= ZOBRIST.castling[self.castling_rights as usize];
    }

    fn set_ep_square(&mut self, new_ep: Option<Square>) {
        self.hash ^= ZOBRIST.ep_file(self.ep_square.map(file));
        self.ep_square = new_ep;
        self.hash ^= ZOBRIST.ep_file(self.ep_square.map(file));
    }

    /// Plays `m` on the board. The move must have been produced by
    /// `generate_moves`/`legal_moves` for the current position.
    ///
    /// Invariant: `undo_move` exactly restores the position that was
    /// current before this call, including the Zobrist key and all
    /// accumulators.
    pub fn do_move(&mut self, m: Move) {
        let us = self.side_to_move;
        let them = opposite(us);
        let old_castling_rights = self.castling_rights;
        let old_ep_square = self.ep_square;
        let old_halfmove_clock = self.halfmove_clock;
        let old_hash = self.hash;

        self.history.push(self.hash);

        if m.is_null() {
            self.set_ep_square(None);
            self.side_to_move = them;
            self.hash ^= ZOBRIST.side_to_move;
            self.halfmove_clock += 1;
            self.undo_stack.push(UndoInfo {
                mv: m,
                captured_square: m.to(),
                captured_idx: 0,
                promo_idx: 0,
                old_castling_rights,
                old_ep_square,
                old_halfmove_clock,
                old_hash,
            });
            return;
        }

        let from = m.from();
        let to = m.to();
        let piece = m.piece();
        let mut captured_square = to;
        let mut captured_idx = 0usize;
        let mut promo_idx = 0usize;

        if piece == PAWN || m.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if m.is_en_passant() {
            captured_square = square(file(to), rank(from));
            captured_idx = self.remove_piece(them, captured_square);
        } else if m.is_capture() {
            captured_idx = self.remove_piece(them, to);
        }

        self.relocate_piece(us, from, to);

        if m.is_promotion() {
            promo_idx = self.remove_piece(us, to);
            self.add_piece(us, m.promotion(), to);
        }

        if m.is_castling() {
            let back_rank = rank(from);
            let (rook_from, rook_to) = if file(to) == FILE_G {
                (square(FILE_H, back_rank), square(5, back_rank))
            } else {
                (square(FILE_A, back_rank), square(3, back_rank))
            };
            self.relocate_piece(us, rook_from, rook_to);
        }

        let mut new_rights = old_castling_rights;
        if piece == KING {
            new_rights &= !(oo_right(us) | ooo_right(us));
        }
        let clears_rights = |rights: u8, sq: Square| -> u8 {
            let mut r = rights;
            if sq == square(FILE_A, 0) {
                r &= !WHITE_OOO;
            } else if sq == square(FILE_H, 0) {
                r &= !WHITE_OO;
            } else if sq == square(FILE_A, 7) {
                r &= !BLACK_OOO;
            } else if sq == square(FILE_H, 7) {
                r &= !BLACK_OO;
            }
            r
        };
        new_rights = clears_rights(new_rights, from);
        new_rights = clears_rights(new_rights, captured_square);
        self.set_castling_rights(new_rights);

        let new_ep = if m.is_double_push() {
            Some(square(file(from), (rank(from) + rank(to)) / 2))
        } else {
            None
        };
        self.set_ep_square(new_ep);

        self.side_to_move = them;
        self.hash ^= ZOBRIST.side_to_move;
        if us == BLACK {
            self.fullmove_number += 1;
        }

        self.undo_stack.push(UndoInfo {
            mv: m,
            captured_square,
            captured_idx,
            promo_idx,
            old_castling_rights,
            old_ep_square,
            old_halfmove_clock,
            old_hash,
        });
    }

    /// Takes back the last move played, restoring the position exactly.
    pub fn undo_move(&mut self) {
        let undo = self.undo_stack.pop().expect("undo_move called with empty history");
        self.history.pop();
        let them = self.side_to_move;
        let us = opposite(them);
        self.side_to_move = us;

        if us == BLACK {
            // fullmove_number was incremented when black moved; nothing
            // else to undo here since we restore it via hash/state below.
        }
        if undo.mv.is_null() {
            self.castling_rights = undo.old_castling_rights;
            self.ep_square = undo.old_ep_square;
            self.halfmove_clock = undo.old_halfmove_clock;
            self.hash = undo.old_hash;
            return;
        }

        let from = undo.mv.from();
        let to = undo.mv.to();

        if undo.mv.is_castling() {
            let back_rank = rank(from);
            let (rook_from, rook_to) = if file(to) == FILE_G {
                (square(FILE_H, back_rank), square(5, back_rank))
            } else {
                (square(FILE_A, back_rank), square(3, back_rank))
            };
            self.relocate_piece_raw(us, rook_to, rook_from);
        }

        if undo.mv.is_promotion() {
            // The promoted piece is always the last entry in `piece_list[us]`
            // (nothing has grown or shrunk that list since `add_piece` put it
            // there), so removing it here can't disturb any other piece's
            // index.
            self.remove_piece(us, to);
            self.restore_piece_at_index(us, PAWN, to, undo.promo_idx);
        }

        self.relocate_piece_raw(us, to, from);

        if undo.mv.is_en_passant() {
            self.restore_piece_at_index(them, PAWN, undo.captured_square, undo.captured_idx);
        } else if undo.mv.is_capture() {
            self.restore_piece_at_index(them, undo.mv.captured_piece(), undo.captured_square, undo.captured_idx);
        }

        self.castling_rights = undo.old_castling_rights;
        self.ep_square = undo.old_ep_square;
        self.halfmove_clock = undo.old_halfmove_clock;
        self.hash = undo.old_hash;
    }

    /// Moves a piece in place, the way `relocate_piece` does, but
    /// without touching the hash -- used only by `undo_move`, which
    /// restores the hash from the saved `old_hash` wholesale instead of
    /// incrementally. Material is unaffected (same piece, no capture),
    /// but the piece-square-table accumulator still needs the same
    /// per-square adjustment `relocate_piece` made, since nothing else
    /// reverts it.
    fn relocate_piece_raw(&mut self, color: Color, from: Square, to: Square) {
        let piece = self.squares[from];
        self.squares[from] = NO_PIECE;
        self.squares[to] = piece;
        self.colors[to] = color;
        if piece == KING {
            self.piece_list[color][0] = to;
        } else if let Some(idx) = self.piece_list[color].iter().position(|&s| s == from) {
            self.piece_list[color][idx] = to;
        }
        self.psqt[color] =
            self.psqt[color] - crate::eval::psqt::value(color, piece, from) + crate::eval::psqt::value(color, piece, to);
    }

    /// Generates pseudo-legal moves (may leave the mover's own king in
    /// check): all moves, castling and en passant included.
    pub fn generate_pseudo_moves(&self) -> Vec<Move> {
        movegen::generate_pseudo_moves(self, false)
    }

    /// Generates only pseudo-legal captures and promotions, for use by
    /// quiescence search.
    pub fn generate_pseudo_captures(&self) -> Vec<Move> {
        movegen::generate_pseudo_moves(self, true)
    }

    /// Returns whether `m` leaves the mover's own king in check.
    pub fn is_move_legal(&self, m: Move) -> bool {
        let mut pos = self.clone();
        let mover = pos.side_to_move;
        pos.do_move(m);
        !pos.is_square_attacked(pos.king_square(mover), pos.side_to_move)
    }

    /// Generates all legal moves in the position.
    pub fn generate_legal_moves(&self) -> Vec<Move> {
        self.generate_pseudo_moves()
            .into_iter()
            .filter(|&m| self.is_move_legal(m))
            .collect()
    }

    /// Generates all legal non-capturing, non-promoting moves. Used by
    /// quiescence search to distinguish "no quiet moves" (checkmate or
    /// stalemate) from "the position is quiet".
    pub fn generate_legal_noncaptures(&self) -> Vec<Move> {
        self.generate_pseudo_moves()
            .into_iter()
            .filter(|m| !m.is_capture() && !m.is_promotion())
            .filter(|&m| self.is_move_legal(m))
            .collect()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.generate_legal_moves()
    }

    /// Returns the result of a Static Exchange Evaluation for a
    /// pseudo-legal capture: the material the side to move can expect
    /// to net from the sequence of captures on the destination square.
    pub fn static_exchange_eval(&self, m: Move) -> i32 {
        see::static_exchange_eval(self, m)
    }

    /// Plays a null move (passes the turn). Disallowed, by convention,
    /// when the side to move is in check; callers are responsible for
    /// that check (see `search::alpha_beta::is_nullmove_allowed`).
    pub fn do_nullmove(&mut self) {
        let king_sq = self.king_square(self.side_to_move);
        self.do_move(Move::null(king_sq));
    }

    pub fn undo_nullmove(&mut self) {
        self.undo_move();
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.squares == other.squares
            && self.colors == other.colors
            && self.side_to_move == other.side_to_move
            && self.castling_rights == other.castling_rights
            && self.ep_square == other.ep_square
            && self.hash == other.hash
            && self.halfmove_clock == other.halfmove_clock
            && self.piece_list == other.piece_list
            && self.piece_count == other.piece_count
            && self.material == other.material
            && self.psqt == other.psqt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_do_undo_roundtrip_start_position() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        let mut p = pos.clone();
        for mv in p.clone().generate_legal_moves() {
            let mut q = pos.clone();
            let before_hash = q.hash;
            q.do_move(mv);
            q.undo_move();
            assert_eq!(q.hash, before_hash);
            assert_eq!(q, pos);
        }
        let _ = &mut p;
    }

    #[test]
    fn test_do_undo_roundtrip_with_captures_and_promotion() {
        // b7 can push to b8 (promotion only) or capture the rook on a8
        // (capture and promotion together); the knight on g4 can capture
        // the rook on h2 (a plain capture, no promotion). Exercises every
        // `piece_list` reordering path `remove_piece`/`restore_piece_at_index`
        // must invert exactly.
        let pos = Position::from_fen("r3k3/1P6/8/8/6N1/8/7r/4K3 w - - 0 1").unwrap();
        for mv in pos.clone().generate_legal_moves() {
            let mut q = pos.clone();
            q.do_move(mv);
            q.undo_move();
            assert_eq!(q, pos, "mismatch after do/undo of {}", mv.to_la_str());
            assert_eq!(q.piece_list, pos.piece_list, "piece_list reordered by {}", mv.to_la_str());
        }
    }

    #[test]
    fn test_do_undo_roundtrip_with_en_passant() {
        let pos = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let ep_capture = pos
            .generate_legal_moves()
            .into_iter()
            .find(|m| m.is_en_passant())
            .expect("exd6 should be available");
        let mut q = pos.clone();
        q.do_move(ep_capture);
        q.undo_move();
        assert_eq!(q, pos);
        assert_eq!(q.piece_list, pos.piece_list);
    }

    #[test]
    fn test_king_on_index_zero() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        assert_eq!(pos.squares[pos.king_square(WHITE)], KING);
        assert_eq!(pos.squares[pos.king_square(BLACK)], KING);
    }

    #[test]
    fn test_insufficient_material_draw() {
        let pos = Position::from_fen("8/8/8/8/8/6k1/8/6K1 w - - 0 1").unwrap();
        assert!(pos.has_insufficient_material());
        assert!(pos.is_draw());
    }
}
