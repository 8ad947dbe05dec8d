//! Implements the "Universal Chess Interface" protocol: a line-based
//! text protocol for talking to a GUI over stdin/stdout.
//!
//! The search itself is single-threaded and cooperative -- it never
//! blocks except at the periodic polls `crate::search` performs every
//! `POLL_INTERVAL` nodes. Non-blocking stdin is achieved the way this
//! protocol loop's reference implementation achieves it: one
//! background thread blocks on `read_line` (the only blocking I/O in
//! the whole process) and forwards parsed commands over an
//! `mpsc::channel`; `stop`/`quit` additionally flip a shared abort flag
//! immediately; so an in-progress `Engine::go` call observes them at
//! its very next poll without waiting for the main thread to drain the
//! channel.

use crate::engine::Engine;
use crate::moves::NO_MOVE;
use crate::search::deepening::IterationReport;
use crate::search::tt::MATE_VALUE;
use crate::search::SearchControl;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

#[derive(Default, Clone)]
pub struct GoParams {
    pub searchmoves: Vec<String>,
    pub infinite: bool,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
}

enum Command {
    Uci,
    IsReady,
    UciNewGame,
    SetOption { name: String, value: String },
    Position { fen: String, moves: Vec<String> },
    Go(GoParams),
    Stop,
    Quit,
    Unrecognized(String),
}

const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn parse_command(line: &str) -> Command {
    lazy_static! {
        static ref RE: Regex = Regex::new(
            r"\b(uci|setoption|isready|ucinewgame|position|go|stop|quit)\b(?:\s(.*))?"
        ).unwrap();
    }
    let caps = match RE.captures(line.trim()) {
        Some(c) => c,
        None => return Command::Unrecognized(line.trim().to_string()),
    };
    let keyword = caps.get(1).unwrap().as_str();
    let rest = caps.get(2).map_or("", |m| m.as_str());
    match keyword {
        "uci" => Command::Uci,
        "isready" => Command::IsReady,
        "ucinewgame" => Command::UciNewGame,
        "stop" => Command::Stop,
        "quit" => Command::Quit,
        "setoption" => parse_setoption(rest),
        "position" => parse_position(rest),
        "go" => parse_go(rest),
        _ => Command::Unrecognized(line.trim().to_string()),
    }
}

fn parse_setoption(s: &str) -> Command {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^name\s+(\S.*?)(?:\s+value\s+(.*?))?\s*$").unwrap();
    }
    match RE.captures(s) {
        Some(caps) => Command::SetOption {
            name: caps.get(1).unwrap().as_str().to_string(),
            value: caps.get(2).map_or(String::new(), |m| m.as_str().to_string()),
        },
        None => Command::Unrecognized(format!("setoption {}", s)),
    }
}

fn parse_position(s: &str) -> Command {
    lazy_static! {
        static ref RE: Regex = Regex::new(
            r"^(?:fen\s+(?P<fen>[1-8KQRBNPkqrbnp/]+\s+[wb]\s+(?:[KQkq]{1,4}|-)\s+(?:[a-h][1-8]|-)\s+\d+\s+\d+)|startpos)(?:\s+moves(?P<moves>(?:\s+[a-h][1-8][a-h][1-8][qrbn]?)*))?\s*$"
        ).unwrap();
    }
    match RE.captures(s) {
        Some(caps) => {
            let fen = caps.name("fen").map_or(STARTPOS_FEN.to_string(), |m| m.as_str().to_string());
            let moves = caps
                .name("moves")
                .map_or(Vec::new(), |m| m.as_str().split_whitespace().map(|s| s.to_string()).collect());
            Command::Position { fen, moves }
        }
        None => Command::Unrecognized(format!("position {}", s)),
    }
}

fn parse_go(s: &str) -> Command {
    lazy_static! {
        static ref RE: Regex = Regex::new(
            r"\b(?P<keyword>wtime|btime|winc|binc|movestogo|depth|nodes|mate|movetime|ponder|infinite|searchmoves)(?:\s+(?P<number>\d+)|(?P<moves>(?:\s+[a-h][1-8][a-h][1-8][qrbn]?)+))?(?:\s+|$)"
        ).unwrap();
    }
    let mut params = GoParams::default();
    for caps in RE.captures_iter(s) {
        let keyword = caps.name("keyword").unwrap().as_str();
        match keyword {
            "searchmoves" => {
                if let Some(moves) = caps.name("moves") {
                    params.searchmoves = moves.as_str().split_whitespace().map(|s| s.to_string()).collect();
                }
            }
            "infinite" => params.infinite = true,
            "ponder" => {}
            _ => {
                if let Some(number) = caps.name("number") {
                    let n: u64 = match number.as_str().parse() {
                        Ok(n) => n,
                        Err(_) => continue,
                    };
                    match keyword {
                        "wtime" => params.wtime = Some(n),
                        "btime" => params.btime = Some(n),
                        "winc" => params.winc = Some(n),
                        "binc" => params.binc = Some(n),
                        "movestogo" => params.movestogo = Some(n),
                        "depth" => params.depth = Some(n as i32),
                        "nodes" => params.nodes = Some(n),
                        "mate" => {}
                        "movetime" => params.movetime = Some(n),
                        _ => unreachable!(),
                    }
                }
            }
        }
    }
    Command::Go(params)
}

/// Derives the time/node/depth budget for one search from a `go`
/// command's subflags, per the engine's own remaining clock when
/// `wtime`/`btime` are given instead of a fixed `movetime`.
fn build_search_control(params: &GoParams, side_to_move: crate::basetypes::Color) -> SearchControl {
    let mut control = SearchControl { infinite: params.infinite, ..Default::default() };
    control.depth_limit = params.depth;
    control.node_limit = params.nodes;

    if let Some(movetime) = params.movetime {
        control.time_target_ms = Some(movetime);
        control.time_limit_ms = Some(movetime);
        return control;
    }

    let my_time = if side_to_move == crate::basetypes::WHITE { params.wtime } else { params.btime };
    let my_inc = if side_to_move == crate::basetypes::WHITE { params.winc } else { params.binc }.unwrap_or(0);
    if let Some(my_time) = my_time {
        let movestogo = params.movestogo.unwrap_or(30).max(1);
        let target = (my_time / movestogo + my_inc).saturating_sub(50).max(20);
        control.time_target_ms = Some(target);
        control.time_limit_ms = Some(my_time.saturating_sub(50).max(target));
    }

    control
}

fn format_score(score: i32) -> String {
    if score.abs() >= MATE_VALUE - 1000 {
        let plies = MATE_VALUE - score.abs();
        let moves_to_mate = (plies + 1) / 2;
        format!("mate {}", if score > 0 { moves_to_mate } else { -moves_to_mate })
    } else {
        format!("cp {}", score)
    }
}

fn print_iteration(report: &IterationReport) {
    let pv: Vec<String> = report.pv.iter().map(|m| m.to_la_str()).collect();
    println!(
        "info depth {} score {} time {} nodes {} pv {}",
        report.depth,
        format_score(report.score),
        report.time_ms,
        report.nodes,
        pv.join(" ")
    );
}

/// Spawns the background stdin reader, then runs the protocol loop
/// until `quit` or end of input. `book_path`, if given, is loaded
/// before the loop starts processing commands.
pub fn run(book_path: Option<PathBuf>) -> io::Result<()> {
    let mut engine = Engine::new();
    if let Some(path) = book_path {
        engine.load_book(&path);
    }

    let (tx, rx): (Sender<Command>, Receiver<Command>) = channel();
    let abort_signal = engine.abort_signal();
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => {
                    let _ = tx.send(Command::Quit);
                    return;
                }
                Ok(_) => {}
            }
            let cmd = parse_command(&line);
            if matches!(cmd, Command::Stop | Command::Quit) {
                abort_signal.store(true, Ordering::Relaxed);
            }
            let quitting = matches!(cmd, Command::Quit);
            if tx.send(cmd).is_err() || quitting {
                return;
            }
        }
    });

    loop {
        let cmd = match rx.recv() {
            Ok(c) => c,
            Err(_) => break,
        };
        match cmd {
            Command::Uci => {
                println!("id name Kestrel");
                println!("id author the Kestrel engine contributors");
                for line in crate::options::describe() {
                    println!("{}", line);
                }
                println!("uciok");
            }
            Command::IsReady => println!("readyok"),
            Command::UciNewGame => engine.new_game(),
            Command::SetOption { name, value } => engine.set_option(&name, &value),
            Command::Position { fen, moves } => engine.set_position(&fen, &moves),
            Command::Go(params) => {
                let control = build_search_control(&params, engine.side_to_move());
                let target = control.time_target_ms;
                let restrict = if params.searchmoves.is_empty() { None } else { Some(params.searchmoves.as_slice()) };

                let mut last_report: Option<IterationReport> = None;
                let best = engine.go(
                    control,
                    restrict,
                    |report| {
                        print_iteration(report);
                        last_report = Some(IterationReport {
                            depth: report.depth,
                            score: report.score,
                            pv: report.pv.clone(),
                            nodes: report.nodes,
                            time_ms: report.time_ms,
                        });
                    },
                    |m, n| println!("info currmove {} currmovenumber {}", m.to_la_str(), n),
                );

                if let (Some(report), Some(target)) = (&last_report, target) {
                    println!("info string targettime {} elapsedtime {}", target, report.time_ms);
                }
                let hash_pv = engine.hash_pv();
                if !hash_pv.is_empty() {
                    let s: Vec<String> = hash_pv.iter().map(|m| m.to_la_str()).collect();
                    println!("info string hashpv {}", s.join(" "));
                }

                let mv = if best == NO_MOVE { "0000".to_string() } else { best.to_la_str() };
                println!("bestmove {}", mv);
            }
            Command::Stop => {}
            Command::Quit => break,
            Command::Unrecognized(s) => {
                log::debug!("unrecognized input: {}", s);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert!(matches!(parse_command("isready"), Command::IsReady));
        assert!(matches!(parse_command("  isready  "), Command::IsReady));
        assert!(matches!(parse_command("ucinewgame"), Command::UciNewGame));
        assert!(matches!(parse_command("stop"), Command::Stop));
        assert!(matches!(parse_command("quit"), Command::Quit));
        assert!(matches!(parse_command("uci"), Command::Uci));
    }

    #[test]
    fn test_parse_setoption() {
        match parse_command("setoption name Hash value 64") {
            Command::SetOption { name, value } => {
                assert_eq!(name, "Hash");
                assert_eq!(value, "64");
            }
            _ => panic!("expected SetOption"),
        }
    }

    #[test]
    fn test_parse_position_startpos_with_moves() {
        match parse_command("position startpos moves e2e4 e7e5") {
            Command::Position { fen, moves } => {
                assert_eq!(fen, STARTPOS_FEN);
                assert_eq!(moves, vec!["e2e4".to_string(), "e7e5".to_string()]);
            }
            _ => panic!("expected Position"),
        }
    }

    #[test]
    fn test_parse_position_fen() {
        match parse_command("position fen 8/8/8/8/8/8/8/k6K w - - 0 1 moves e2e4") {
            Command::Position { fen, moves } => {
                assert_eq!(fen, "8/8/8/8/8/8/8/k6K w - - 0 1");
                assert_eq!(moves, vec!["e2e4".to_string()]);
            }
            _ => panic!("expected Position"),
        }
    }

    #[test]
    fn test_parse_go_depth_and_movetime() {
        match parse_command("go depth 6 movetime 5000") {
            Command::Go(params) => {
                assert_eq!(params.depth, Some(6));
                assert_eq!(params.movetime, Some(5000));
            }
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn test_parse_go_infinite_with_clock() {
        match parse_command("go wtime 22000 infinite btime 11000") {
            Command::Go(params) => {
                assert!(params.infinite);
                assert_eq!(params.wtime, Some(22000));
                assert_eq!(params.btime, Some(11000));
            }
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn test_parse_go_searchmoves() {
        match parse_command("go searchmoves e2e4 c7c8q") {
            Command::Go(params) => {
                assert_eq!(params.searchmoves, vec!["e2e4".to_string(), "c7c8q".to_string()]);
            }
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn test_format_score_plain_centipawns() {
        assert_eq!(format_score(37), "cp 37");
        assert_eq!(format_score(-12), "cp -12");
    }

    #[test]
    fn test_format_score_mate() {
        assert_eq!(format_score(MATE_VALUE - 1), "mate 1");
        assert_eq!(format_score(-(MATE_VALUE - 3)), "mate -2");
    }

    #[test]
    fn test_build_search_control_movetime() {
        let params = GoParams { movetime: Some(1500), ..Default::default() };
        let control = build_search_control(&params, crate::basetypes::WHITE);
        assert_eq!(control.time_target_ms, Some(1500));
    }

    #[test]
    fn test_build_search_control_clock_allocates_a_fraction() {
        let params = GoParams { wtime: Some(60_000), movestogo: Some(30), ..Default::default() };
        let control = build_search_control(&params, crate::basetypes::WHITE);
        let target = control.time_target_ms.unwrap();
        assert!(target > 0 && target < 60_000);
    }
}
