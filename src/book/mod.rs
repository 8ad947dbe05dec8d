//! Reads Chessbase's CTG opening book format and serves book moves for
//! positions the engine reaches before falling back to search.

pub mod lookup;
pub mod select;
pub mod signature;

use crate::board::Position;
use crate::error::BookError;
use crate::moves::Move;
use lookup::{Book, BookEntry};
use std::path::Path;

/// An opened CTG book, ready to be probed for the current position on
/// every move the engine is asked to play.
pub struct OpeningBook {
    book: Book,
}

impl OpeningBook {
    pub fn open(ctg_path: &Path) -> Result<OpeningBook, BookError> {
        Ok(OpeningBook { book: Book::open(ctg_path)? })
    }

    /// Looks up the book entry for `pos`, if any.
    pub fn entry_for(&self, pos: &Position) -> Result<Option<BookEntry>, BookError> {
        let sig = signature::compute(pos);
        let hash = signature::hash(&sig);
        self.book.lookup(&sig, hash)
    }

    /// Picks a move for `pos` by the book's weighting scheme, or
    /// `None` on a miss (no entry, or every candidate move malformed
    /// or zero-weighted).
    pub fn pick_move(&self, pos: &Position) -> Option<Move> {
        let entry = self.entry_for(pos).ok()??;
        select::pick_move(self, pos, &entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_open_reports_io_error_for_missing_file() {
        let result = OpeningBook::open(Path::new("/nonexistent/path/does-not-exist.ctg"));
        assert!(result.is_err());
    }
}
