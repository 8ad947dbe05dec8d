//! The UCI option registry: declares the options this engine exposes
//! (`Hash`, `Output Delay`, `Use endgame bitbases`, `Endgame bitbase
//! path`), renders them for the `uci` handshake, and applies
//! `setoption` values -- an out-of-range value for a known option
//! falls back to that option's declared default rather than erroring.

use crate::error::OptionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OptionKind {
    Spin,
    Check,
    String,
}

struct OptionSpec {
    name: &'static str,
    kind: OptionKind,
    default: &'static str,
    min: i64,
    max: i64,
}

const OPTIONS: [OptionSpec; 4] = [
    OptionSpec { name: "Hash", kind: OptionKind::Spin, default: "32", min: 1, max: 4096 },
    OptionSpec { name: "Output Delay", kind: OptionKind::Spin, default: "2000", min: 0, max: 1_000_000 },
    OptionSpec { name: "Use endgame bitbases", kind: OptionKind::Check, default: "true", min: 0, max: 0 },
    OptionSpec { name: "Endgame bitbase path", kind: OptionKind::String, default: ".", min: 0, max: 0 },
];

/// The live values of the options above. Reserved options (the two
/// endgame-bitbase ones) are stored and reported faithfully but have
/// no effect on search, mirroring the no-op hook this registry's
/// source left unimplemented.
#[derive(Clone)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub output_delay_ms: u64,
    pub use_endgame_bitbases: bool,
    pub endgame_bitbase_path: String,
}

impl Default for EngineOptions {
    fn default() -> EngineOptions {
        EngineOptions {
            hash_mb: 32,
            output_delay_ms: 2000,
            use_endgame_bitbases: true,
            endgame_bitbase_path: ".".to_string(),
        }
    }
}

impl EngineOptions {
    /// Applies a `setoption name <name> value <value>` pair. Returns
    /// an error only when `name` isn't one of the options `describe`
    /// advertises; a recognized spin option given an out-of-range or
    /// unparseable value silently resolves to its declared default.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let spec = OPTIONS
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;

        match spec.kind {
            OptionKind::Spin => {
                let default: i64 = spec.default.parse().expect("option default is a valid integer");
                let n = value
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|&n| n >= spec.min && n <= spec.max)
                    .unwrap_or(default);
                match spec.name {
                    "Hash" => self.hash_mb = n as usize,
                    "Output Delay" => self.output_delay_ms = n as u64,
                    _ => unreachable!("spin option without a backing field"),
                }
            }
            OptionKind::Check => {
                let b = value.trim().eq_ignore_ascii_case("true");
                match spec.name {
                    "Use endgame bitbases" => self.use_endgame_bitbases = b,
                    _ => unreachable!("check option without a backing field"),
                }
            }
            OptionKind::String => match spec.name {
                "Endgame bitbase path" => self.endgame_bitbase_path = value.trim().to_string(),
                _ => unreachable!("string option without a backing field"),
            },
        }
        Ok(())
    }
}

/// Renders the full option set as `option name ... type ...` lines,
/// printed once at the `uci` handshake.
pub fn describe() -> Vec<String> {
    OPTIONS
        .iter()
        .map(|o| match o.kind {
            OptionKind::Spin => {
                format!("option name {} type spin default {} min {} max {}", o.name, o.default, o.min, o.max)
            }
            OptionKind::Check => format!("option name {} type check default {}", o.name, o.default),
            OptionKind::String => format!("option name {} type string default {}", o.name, o.default),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_out_of_range_falls_back_to_default() {
        let mut opts = EngineOptions::default();
        opts.set("Hash", "999999").unwrap();
        assert_eq!(opts.hash_mb, 32);
    }

    #[test]
    fn test_hash_in_range_is_applied() {
        let mut opts = EngineOptions::default();
        opts.set("Hash", "64").unwrap();
        assert_eq!(opts.hash_mb, 64);
    }

    #[test]
    fn test_unparseable_value_falls_back_to_default() {
        let mut opts = EngineOptions::default();
        opts.set("Output Delay", "not-a-number").unwrap();
        assert_eq!(opts.output_delay_ms, 2000);
    }

    #[test]
    fn test_unknown_option_is_reported() {
        let mut opts = EngineOptions::default();
        assert!(opts.set("Nonexistent", "1").is_err());
    }

    #[test]
    fn test_check_option_parses_bool() {
        let mut opts = EngineOptions::default();
        opts.set("Use endgame bitbases", "false").unwrap();
        assert!(!opts.use_endgame_bitbases);
    }

    #[test]
    fn test_option_name_is_case_insensitive() {
        let mut opts = EngineOptions::default();
        opts.set("hash", "32").unwrap();
        assert_eq!(opts.hash_mb, 32);
    }

    #[test]
    fn test_describe_lists_all_four_options() {
        assert_eq!(describe().len(), 4);
    }
}
