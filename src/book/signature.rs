//! Canonical position signatures for the CTG opening book format: a
//! bit-packed encoding of the board that is invariant under
//! side-to-move flip and, in endgame-like positions, queenside mirror,
//! plus the 32-bit hash derived from it that indexes the book's page
//! table.

use crate::basetypes::*;
use crate::board::Position;

/// Appends bits one at a time, MSB-first, into a growable byte buffer.
/// The first byte is reserved for the header and filled in by the
/// caller once the whole signature is known.
struct BitWriter {
    buf: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    fn new() -> BitWriter {
        BitWriter { buf: vec![0u8], bit_len: 8 }
    }

    fn push_bit(&mut self, bit: u8) {
        let byte_idx = self.bit_len / 8;
        if byte_idx >= self.buf.len() {
            self.buf.push(0);
        }
        if bit != 0 {
            self.buf[byte_idx] |= 1 << (7 - (self.bit_len % 8));
        }
        self.bit_len += 1;
    }

    /// Appends the `n` low bits of `value`, most significant bit first.
    fn write_bits_msb_first(&mut self, value: u32, n: usize) {
        for i in (0..n).rev() {
            self.push_bit(((value >> i) & 1) as u8);
        }
    }

    /// Bits remaining before the next byte boundary.
    fn bits_to_byte_boundary(&self) -> usize {
        (8 - (self.bit_len % 8)) % 8
    }

    fn pad_to_byte_boundary(&mut self) {
        let n = self.bits_to_byte_boundary();
        for _ in 0..n {
            self.push_bit(0);
        }
    }

    fn pad_bits(&mut self, n: usize) {
        for _ in 0..n {
            self.push_bit(0);
        }
    }
}

/// Variable-width, MSB-first bit codes for each occupant of a square,
/// canonical color already applied. Index order matches the piece
/// kinds in `basetypes`.
fn piece_code(color: Color, piece: PieceType) -> (u32, usize) {
    match (color, piece) {
        (WHITE, PAWN) => (0b011, 3),
        (BLACK, PAWN) => (0b111, 3),
        (WHITE, KNIGHT) => (0b01001, 5),
        (BLACK, KNIGHT) => (0b11001, 5),
        (WHITE, BISHOP) => (0b00101, 5),
        (BLACK, BISHOP) => (0b10101, 5),
        (WHITE, ROOK) => (0b01101, 5),
        (BLACK, ROOK) => (0b11101, 5),
        (WHITE, QUEEN) => (0b010001, 6),
        (BLACK, QUEEN) => (0b110001, 6),
        (WHITE, KING) => (0b000001, 6),
        (BLACK, KING) => (0b100001, 6),
        _ => unreachable!("no signature code for this piece/color combination"),
    }
}

pub(crate) fn mirror_rank(sq: Square) -> Square {
    square(file(sq), 7 - rank(sq))
}

pub(crate) fn mirror_file(sq: Square) -> Square {
    square(7 - file(sq), rank(sq))
}

/// Whether the position's side to move must be flipped to White to put
/// it in canonical form (the book only ever stores positions as if
/// White were about to move).
pub fn flips_to_move(pos: &Position) -> bool {
    pos.side_to_move == BLACK
}

/// Whether the canonical (post-flip) position should additionally be
/// mirrored across the central file: the canonical king stands on the
/// queenside and neither side holds any castling right.
pub fn mirrors_queenside(pos: &Position) -> bool {
    let flip = flips_to_move(pos);
    let canonical_white = if flip { BLACK } else { WHITE };
    file(pos.king_square(canonical_white)) < FILE_E && pos.castling_rights == 0
}

/// Maps a real square on the board to the square whose occupant should
/// be read when filling in the canonical signature square `canon_sq`.
pub(crate) fn to_real_square(canon_sq: Square, flip: bool, mirror: bool) -> Square {
    let mut sq = canon_sq;
    if flip {
        sq = mirror_rank(sq);
    }
    if mirror {
        sq = mirror_file(sq);
    }
    sq
}

/// Computes the canonical signature buffer for `pos`.
pub fn compute(pos: &Position) -> Vec<u8> {
    let flip = flips_to_move(pos);
    let mirror = mirrors_queenside(pos);
    let canonical_white = if flip { BLACK } else { WHITE };

    let mut w = BitWriter::new();
    for f in 0..8 {
        for r in 0..8 {
            let canon_sq = square(f, r);
            let real_sq = to_real_square(canon_sq, flip, mirror);
            let occupant = pos.squares[real_sq];
            if occupant == NO_PIECE {
                w.write_bits_msb_first(0, 1);
                continue;
            }
            let real_color = pos.colors[real_sq];
            let canon_color = if flip { opposite(real_color) } else { real_color };
            let (code, len) = piece_code(canon_color, occupant);
            w.write_bits_msb_first(code, len);
        }
    }

    let ep_file = pos.ep_square.map(|sq| {
        let f = file(sq);
        if mirror {
            7 - f
        } else {
            f
        }
    });

    let mut castle = 0u32;
    if pos.has_oo_rights(canonical_white) {
        castle += 4;
    }
    if pos.has_ooo_rights(canonical_white) {
        castle += 8;
    }
    if pos.has_oo_rights(opposite(canonical_white)) {
        castle += 1;
    }
    if pos.has_ooo_rights(opposite(canonical_white)) {
        castle += 2;
    }

    let castle_bits = if castle != 0 { 4 } else { 0 };
    let ep_bits = if ep_file.is_some() { 3 } else { 0 };
    let flag_bit_length = castle_bits + ep_bits;

    if flag_bit_length > 0 {
        if w.bits_to_byte_boundary() < flag_bit_length {
            w.pad_to_byte_boundary();
        }
        let pad = w.bits_to_byte_boundary().saturating_sub(flag_bit_length);
        w.pad_bits(pad);
        if castle_bits > 0 {
            w.write_bits_msb_first(castle, 4);
        }
        if let Some(f) = ep_file {
            w.write_bits_msb_first(f as u32, 3);
        }
    }

    let buf_len = (w.bit_len + 7) / 8;
    w.buf.resize(buf_len, 0);
    w.buf[0] = buf_len as u8;
    if ep_file.is_some() {
        w.buf[0] |= 1 << 5;
    }
    if castle != 0 {
        w.buf[0] |= 1 << 6;
    }
    w.buf
}

const HASH_BITS: [u32; 64] = [
    0x3100d2bf, 0x3118e3de, 0x34ab1372, 0x2807a847, 0x1633f566, 0x2143b359, 0x26d56488, 0x3b9e6f59,
    0x37755656, 0x3089ca7b, 0x18e92d85, 0x0cd0e9d8, 0x1a9e3b54, 0x3eaa902f, 0x0d9bfaae, 0x2f32b45b,
    0x31ed6102, 0x3d3c8398, 0x146660e3, 0x0f8d4b76, 0x02c77a5f, 0x146c8799, 0x1c47f51f, 0x249f8f36,
    0x24772043, 0x1fbc1e4d, 0x1e86b3fa, 0x37df36a6, 0x16ed30e4, 0x02c3148e, 0x216e5929, 0x0636b34e,
    0x317f9f56, 0x15f09d70, 0x131026fb, 0x38c784b1, 0x29ac3305, 0x2b485dc5, 0x3c049ddc, 0x35a9fbcd,
    0x31d5373b, 0x2b246799, 0x0a2923d3, 0x08a96e9d, 0x30031a9f, 0x08f525b5, 0x33611c06, 0x2409db98,
    0x0ca4feb2, 0x1000b71e, 0x30566e32, 0x39447d31, 0x194e3752, 0x08233a95, 0x0f38fe36, 0x29c7cd57,
    0x0f7b3a39, 0x328e8a16, 0x1e7d1388, 0x0fba78f5, 0x274c7e7c, 0x1e8be65c, 0x2fa0b0bb, 0x1eb6c371,
];

/// Derives the 32-bit signed book-index hash from a signature buffer.
/// The constants and bit-exact accumulation order come from the book
/// reader this format was designed for, and must be reproduced exactly
/// since the hash is the key into a third-party-generated index file.
pub fn hash(sig: &[u8]) -> i32 {
    let mut hash: i32 = 0;
    let mut tmp: i32 = 0;
    for &b in sig {
        let byte = b as i32;
        tmp = tmp.wrapping_add(((0x0f - (byte & 0x0f)) << 2) + 1);
        hash = hash.wrapping_add(HASH_BITS[(tmp & 0x3f) as usize] as i32);
        tmp = tmp.wrapping_add(((0xf0 - (byte & 0xf0)) >> 2) + 1);
        hash = hash.wrapping_add(HASH_BITS[(tmp & 0x3f) as usize] as i32);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Position, START_POSITION_FEN};

    #[test]
    fn test_header_byte_length_matches_payload() {
        let pos = Position::from_fen(START_POSITION_FEN).unwrap();
        let sig = compute(&pos);
        assert_eq!(sig[0] as usize & 0x1f, sig.len());
    }

    #[test]
    fn test_side_to_move_symmetry() {
        let white_to_move = Position::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        let black_to_move = Position::from_fen("4k3/4p3/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_eq!(compute(&white_to_move), compute(&black_to_move));
        assert_eq!(hash(&compute(&white_to_move)), hash(&compute(&black_to_move)));
    }

    #[test]
    fn test_queenside_mirror_symmetry() {
        let kingside = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let queenside_king = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap();
        // Both positions carry a castling right, so queenside mirroring
        // is gated off for both -- they are not expected to collide.
        assert_ne!(compute(&kingside), compute(&queenside_king));

        let no_rights_queenside = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let no_rights_kingside = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(compute(&no_rights_queenside), compute(&no_rights_kingside));
    }
}
