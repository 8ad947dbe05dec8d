//! The engine object: owns the long-lived resources a single process
//! holds for its whole lifetime -- the position, the transposition
//! table, the loaded opening book (if any), and the option registry --
//! and exposes the operations the protocol layer drives.

use crate::board::{Position, START_POSITION_FEN};
use crate::book::OpeningBook;
use crate::moves::{Move, NO_MOVE};
use crate::options::EngineOptions;
use crate::search::deepening::{iterative_deepen, IterationReport};
use crate::search::node::SearchState;
use crate::search::tt::TranspositionTable;
use crate::search::SearchControl;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Engine {
    position: Position,
    tt: TranspositionTable,
    book: Option<OpeningBook>,
    pub options: EngineOptions,
    abort_signal: Arc<AtomicBool>,
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            position: Position::from_fen(START_POSITION_FEN).expect("start position FEN is well-formed"),
            tt: TranspositionTable::new(),
            book: None,
            options: EngineOptions::default(),
            abort_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares the abort flag with the protocol loop's stdin reader
    /// thread, so `stop`/`quit` can interrupt a search in progress
    /// without waiting for this thread to be free to notice them.
    pub fn abort_signal(&self) -> Arc<AtomicBool> {
        self.abort_signal.clone()
    }

    pub fn side_to_move(&self) -> crate::basetypes::Color {
        self.position.side_to_move
    }

    pub fn new_game(&mut self) {
        self.tt.clear();
    }

    pub fn load_book(&mut self, path: &Path) {
        match OpeningBook::open(path) {
            Ok(book) => {
                log::info!("loaded opening book {}", path.display());
                self.book = Some(book);
            }
            Err(e) => {
                println!("info string couldn't load book: {}", e);
                log::warn!("book load failed: {}", e);
            }
        }
    }

    pub fn set_option(&mut self, name: &str, value: &str) {
        if let Err(e) = self.options.set(name, value) {
            println!("info string {}", e);
            log::warn!("{}", e);
            return;
        }
        if name.eq_ignore_ascii_case("Hash") {
            self.tt.resize_mb(self.options.hash_mb);
        }
    }

    pub fn set_position(&mut self, fen: &str, moves: &[String]) {
        match Position::from_history(fen, moves) {
            Ok(pos) => self.position = pos,
            Err(e) => {
                println!("info string {}", e);
                log::warn!("{}", e);
            }
        }
    }

    /// Runs one search to completion: a book probe first, falling back
    /// to iterative deepening on a miss. Per the single-threaded
    /// cooperative model, this call runs synchronously to the end of
    /// the search, which is ended early only by `control.abort_signal`
    /// being flipped by the protocol loop's reader thread.
    pub fn go(
        &mut self,
        mut control: SearchControl,
        root_moves: Option<&[String]>,
        on_iteration: impl FnMut(&IterationReport),
        on_currmove: impl FnMut(Move, usize),
    ) -> Move {
        self.abort_signal.store(false, Ordering::Relaxed);

        if let Some(book) = &self.book {
            if let Some(m) = book.pick_move(&self.position) {
                log::debug!("book move {}", m.to_la_str());
                return m;
            }
        }

        control.abort_signal = Some(self.abort_signal.clone());
        let mut state = SearchState::new(self.position.clone(), control);
        if let Some(restrict) = root_moves {
            state.root_moves.retain(|m| restrict.iter().any(|s| s == &m.to_la_str()));
        }

        let best =
            iterative_deepen(&mut state, &mut self.tt, self.options.output_delay_ms, on_iteration, on_currmove);
        log::debug!(
            "search done: {} nodes, tt load factor {:.1}%",
            state.nodes_searched,
            self.tt.load_factor() * 100.0
        );
        best
    }

    pub fn stop(&mut self) {
        self.abort_signal.store(true, Ordering::Relaxed);
    }

    /// Walks the transposition table's recorded best moves from the
    /// current position onward, for the supplemental `hashpv` trace.
    /// Stops at the first missing, illegal, or already-visited entry
    /// rather than trusting the table to describe a simple path.
    pub fn hash_pv(&self) -> Vec<Move> {
        let mut pos = self.position.clone();
        let mut pv = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..MAX_HASH_PV_LEN {
            if !seen.insert(pos.hash) {
                break;
            }
            let probe = match self.tt.probe(pos.hash, 0) {
                Some(p) => p,
                None => break,
            };
            if probe.best_move == NO_MOVE {
                break;
            }
            if !pos.legal_moves().contains(&probe.best_move) {
                break;
            }
            pv.push(probe.best_move);
            pos.do_move(probe.best_move);
        }
        pv
    }
}

const MAX_HASH_PV_LEN: usize = 32;

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basetypes::WHITE;

    #[test]
    fn test_new_engine_starts_at_the_initial_position() {
        let engine = Engine::new();
        assert_eq!(engine.side_to_move(), WHITE);
    }

    #[test]
    fn test_hash_option_resizes_transposition_table() {
        let mut engine = Engine::new();
        engine.set_option("Hash", "1");
        assert_eq!(engine.options.hash_mb, 1);
    }

    #[test]
    fn test_go_finds_forced_capture() {
        let mut engine = Engine::new();
        engine.set_position("4k3/8/8/8/8/8/p7/K7 w - - 0 1", &[]);
        let mut control = SearchControl::unlimited();
        control.depth_limit = Some(4);
        let best = engine.go(control, None, |_| {}, |_, _| {});
        assert_eq!(best.to_la_str(), "a1a2");
    }

    #[test]
    fn test_hash_pv_is_empty_before_any_search() {
        let engine = Engine::new();
        assert!(engine.hash_pv().is_empty());
    }
}
