pub mod config;
pub mod generate;
pub mod inspect;
pub mod output;

use std::path::Path;

use mixprime_core::{Config, SelectionFallback};

/// Load a config file, or the defaults when no path is given.
/// Exits with a message on any load or validation error.
pub fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    match Config::from_json_file(Path::new(path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration from {path}: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse a constant written as `0x`-prefixed hex or as decimal.
pub fn parse_value(input: &str) -> Result<u32, String> {
    let trimmed = input.trim().replace('_', "");
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid 32-bit value {input:?}: {e}"))
}

pub fn parse_fallback(name: &str) -> SelectionFallback {
    match name {
        "second-best" | "second_best" => SelectionFallback::SecondBest,
        _ => SelectionFallback::Strict,
    }
}
