//! Parsing of Forsyth-Edwards Notation into a `Position`.

use crate::basetypes::*;
use crate::board::zobrist::ZOBRIST;
use crate::board::{Position, BLACK_OO, BLACK_OOO, WHITE_OO, WHITE_OOO};
use crate::error::FenError;
use crate::eval::Score;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FEN_FIELDS: Regex = Regex::new(
        r"^(?P<board>[pnbrqkPNBRQK1-8/]+)\s+(?P<stm>[wb])\s+(?P<castling>[KQkq-]+)\s+(?P<ep>[a-h][36]|-)\s+(?P<halfmove>\d+)\s+(?P<fullmove>\d+)\s*$"
    ).unwrap();
}

fn piece_from_char(c: char) -> Option<(Color, PieceType)> {
    let color = if c.is_ascii_uppercase() { WHITE } else { BLACK };
    let piece = match c.to_ascii_lowercase() {
        'p' => PAWN,
        'n' => KNIGHT,
        'b' => BISHOP,
        'r' => ROOK,
        'q' => QUEEN,
        'k' => KING,
        _ => return None,
    };
    Some((color, piece))
}

pub fn parse_fen(fen: &str) -> Result<Position, FenError> {
    let caps = FEN_FIELDS
        .captures(fen.trim())
        .ok_or_else(|| FenError(format!("doesn't match FEN grammar: {}", fen)))?;

    let mut pos = Position {
        squares: [NO_PIECE; 64],
        colors: [WHITE; 64],
        side_to_move: WHITE,
        castling_rights: 0,
        ep_square: None,
        piece_list: [Vec::with_capacity(16), Vec::with_capacity(16)],
        piece_count: [[0; 6]; 2],
        hash: 0,
        material: [0; 2],
        psqt: [Score::ZERO; 2],
        halfmove_clock: 0,
        fullmove_number: 1,
        history: Vec::new(),
        undo_stack: Vec::new(),
    };
    // A king placeholder is required at index 0 of each piece list
    // before any non-king piece is added to it.
    pos.piece_list[WHITE].push(0);
    pos.piece_list[BLACK].push(0);

    let board_field = &caps["board"];
    let ranks: Vec<&str> = board_field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError(format!("expected 8 ranks, found {}", ranks.len())));
    }
    for (rank_from_top, rank_str) in ranks.iter().enumerate() {
        let r = 7 - rank_from_top;
        let mut f = 0usize;
        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                f += skip as usize;
            } else {
                let (color, piece) = piece_from_char(c)
                    .ok_or_else(|| FenError(format!("invalid piece character '{}'", c)))?;
                if f >= 8 {
                    return Err(FenError(format!("rank overflow in '{}'", rank_str)));
                }
                let sq = square(f, r);
                place_initial_piece(&mut pos, color, piece, sq);
                f += 1;
            }
        }
        if f != 8 {
            return Err(FenError(format!("rank '{}' does not sum to 8 files", rank_str)));
        }
    }

    for color in [WHITE, BLACK] {
        if pos.piece_count[color][KING] != 1 {
            return Err(FenError(format!(
                "expected exactly one king for {}, found {}",
                if color == WHITE { "white" } else { "black" },
                pos.piece_count[color][KING]
            )));
        }
    }

    pos.side_to_move = if &caps["stm"] == "w" { WHITE } else { BLACK };

    let castling = &caps["castling"];
    if castling != "-" {
        for c in castling.chars() {
            pos.castling_rights |= match c {
                'K' => WHITE_OO,
                'Q' => WHITE_OOO,
                'k' => BLACK_OO,
                'q' => BLACK_OOO,
                _ => return Err(FenError(format!("invalid castling character '{}'", c))),
            };
        }
    }

    let ep = &caps["ep"];
    pos.ep_square = if ep == "-" { None } else { parse_square(ep) };

    pos.halfmove_clock = caps["halfmove"]
        .parse()
        .map_err(|_| FenError("invalid halfmove clock".to_string()))?;
    pos.fullmove_number = caps["fullmove"]
        .parse()
        .map_err(|_| FenError("invalid fullmove number".to_string()))?;

    pos.hash = compute_hash(&pos);
    Ok(pos)
}

/// Places a piece while constructing a fresh position (no captured
/// piece to remove, no hash yet to maintain incrementally).
fn place_initial_piece(pos: &mut Position, color: Color, piece: PieceType, sq: Square) {
    pos.squares[sq] = piece;
    pos.colors[sq] = color;
    if piece == KING {
        pos.piece_list[color][0] = sq;
    } else {
        pos.piece_list[color].push(sq);
    }
    pos.piece_count[color][piece] += 1;
    pos.material[color] += crate::board::piece_value(piece);
    pos.psqt[color] = pos.psqt[color] + crate::eval::psqt::value(color, piece, sq);
}

fn compute_hash(pos: &Position) -> u64 {
    let mut h = 0u64;
    for sq in 0..64 {
        let piece = pos.squares[sq];
        if piece != NO_PIECE {
            h ^= ZOBRIST.piece(pos.colors[sq], piece, sq);
        }
    }
    if pos.side_to_move == BLACK {
        h ^= ZOBRIST.side_to_move;
    }
    h ^= ZOBRIST.castling[pos.castling_rights as usize];
    h ^= ZOBRIST.ep_file(pos.ep_square.map(file));
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_POSITION_FEN;

    #[test]
    fn test_parses_start_position() {
        let pos = parse_fen(START_POSITION_FEN).unwrap();
        assert_eq!(pos.side_to_move, WHITE);
        assert_eq!(pos.castling_rights, WHITE_OO | WHITE_OOO | BLACK_OO | BLACK_OOO);
        assert_eq!(pos.piece_count[WHITE][PAWN], 8);
        assert_eq!(pos.squares[square(FILE_E, RANK_1)], KING);
    }

    #[test]
    fn test_rejects_malformed_fen() {
        assert!(parse_fen("not a fen").is_err());
        assert!(parse_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").is_ok());
    }

    #[test]
    fn test_en_passant_square_parsed() {
        let pos = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(pos.ep_square, Some(square(FILE_D, 5)));
    }
}
