//! Kestrel: a UCI chess engine. Reads commands from stdin and writes
//! the protocol stream to stdout; all diagnostics go through `log` (to
//! stderr), since stdout is reserved for the protocol the GUI parses.

mod basetypes;
mod board;
mod book;
mod engine;
mod error;
mod eval;
mod moves;
mod options;
mod search;
mod uci;

use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let book_path = std::env::args()
        .find_map(|arg| arg.strip_prefix("--book=").map(|s| PathBuf::from(s)));

    if let Err(e) = uci::run(book_path) {
        log::error!("fatal I/O error: {}", e);
        std::process::exit(1);
    }
}
