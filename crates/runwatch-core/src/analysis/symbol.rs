//! Crypto symbol attribution
//!
//! Traces are produced by agents and rarely agree on where the symbol lives,
//! so resolution tries structured fields first and falls back to matching
//! known tickers and names in the run's free text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{Run, UNKNOWN_SYMBOL};

/// Longest `input_data.name` still treated as a ticker
const MAX_TICKER_LEN: usize = 10;

/// Tokens searched in free text, in priority order, with the ticker each maps to
const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("BTC", "BTC"),
    ("BITCOIN", "BTC"),
    ("ETH", "ETH"),
    ("ETHEREUM", "ETH"),
    ("SOL", "SOL"),
    ("SOLANA", "SOL"),
    ("DOGE", "DOGE"),
    ("DOGECOIN", "DOGE"),
    ("ADA", "ADA"),
    ("CARDANO", "ADA"),
    ("DOT", "DOT"),
    ("POLKADOT", "DOT"),
    ("MATIC", "MATIC"),
    ("POLYGON", "MATIC"),
    ("AVAX", "AVAX"),
    ("AVALANCHE", "AVAX"),
    ("LINK", "LINK"),
    ("CHAINLINK", "LINK"),
    ("XRP", "XRP"),
    ("RIPPLE", "XRP"),
    ("BNB", "BNB"),
    ("BINANCE", "BNB"),
    ("USDC", "USDC"),
    ("USDT", "USDT"),
];

/// Lowercase fragments that imply a ticker when no token matched
const DOMAIN_ALIASES: &[(&str, &str)] = &[
    ("binance", "BNB"),
    ("shiba", "DOGE"),
    ("inu", "DOGE"),
    ("polygon", "MATIC"),
];

static TOKEN_PATTERNS: Lazy<Vec<(&'static str, &'static str, Regex)>> = Lazy::new(|| {
    KNOWN_TOKENS
        .iter()
        .filter_map(|&(token, ticker)| {
            Regex::new(&format!(r"\b{token}\b"))
                .ok()
                .map(|pattern| (token, ticker, pattern))
        })
        .collect()
});

/// Resolve the crypto symbol a run works on, or [`UNKNOWN_SYMBOL`]
pub fn resolve_symbol(run: &Run) -> String {
    structured_symbol(run)
        .or_else(|| text_symbol(&run.name, run.error.as_deref().unwrap_or_default()))
        .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string())
}

fn structured_symbol(run: &Run) -> Option<String> {
    let input_data = run.inputs.get("input_data");

    if let Some(symbol) = input_data.and_then(|data| non_empty_str(data.get("crypto_symbol"))) {
        return Some(symbol.to_uppercase());
    }

    if let Some(name) = input_data.and_then(|data| non_empty_str(data.get("name"))) {
        let name = name.trim().to_uppercase();
        if !name.is_empty()
            && name.chars().count() <= MAX_TICKER_LEN
            && name.chars().all(char::is_alphanumeric)
        {
            return Some(name);
        }
    }

    non_empty_str(run.metadata.get("symbol"))
        .or_else(|| non_empty_str(run.extra.get("crypto")))
        .map(str::to_uppercase)
}

// whitespace-only values are treated as missing, same as empty ones
fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Match known tickers and names in a run's name and error text
pub fn text_symbol(name: &str, error: &str) -> Option<String> {
    let text = format!("{name} {error}").to_uppercase();

    for (token, ticker, pattern) in TOKEN_PATTERNS.iter() {
        let pair_notation =
            text.contains(&format!("{token}_")) || text.contains(&format!("{token}-"));
        if pair_notation || pattern.is_match(&text) {
            return Some((*ticker).to_string());
        }
    }

    let lower = text.to_lowercase();
    DOMAIN_ALIASES
        .iter()
        .find(|(alias, _)| lower.contains(alias))
        .map(|(_, ticker)| (*ticker).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn named(name: &str) -> Run {
        Run {
            name: name.to_string(),
            ..Run::default()
        }
    }

    #[test]
    fn test_structured_input_beats_metadata() {
        let run = Run {
            inputs: json!({"input_data": {"crypto_symbol": "ada"}}),
            metadata: json!({"symbol": "BTC"}),
            ..Run::default()
        };
        assert_eq!(resolve_symbol(&run), "ADA");
    }

    #[test]
    fn test_short_input_name_used_as_ticker() {
        let run = Run {
            inputs: json!({"input_data": {"name": "  sol "}}),
            ..Run::default()
        };
        assert_eq!(resolve_symbol(&run), "SOL");
    }

    #[test]
    fn test_long_input_name_is_not_a_ticker() {
        let run = Run {
            inputs: json!({"input_data": {"name": "Bitcoin Cash Analysis"}}),
            extra: json!({"crypto": "bch"}),
            ..Run::default()
        };
        assert_eq!(resolve_symbol(&run), "BCH");
    }

    #[test]
    fn test_whitespace_symbol_counts_as_missing() {
        let run = Run {
            inputs: json!({"input_data": {"crypto_symbol": "   "}}),
            metadata: json!({"symbol": " \t"}),
            extra: json!({"crypto": "avax"}),
            ..Run::default()
        };
        assert_eq!(resolve_symbol(&run), "AVAX");
    }

    #[test]
    fn test_metadata_before_extra() {
        let run = Run {
            metadata: json!({"symbol": "dot"}),
            extra: json!({"crypto": "link"}),
            ..Run::default()
        };
        assert_eq!(resolve_symbol(&run), "DOT");
    }

    #[rstest]
    #[case("BTC_USDT_scraper", "BTC")]
    #[case("eth-price-scraper", "ETH")]
    #[case("fetch Solana news", "SOL")]
    #[case("ripple tracker", "XRP")]
    #[case("shiba_watch", "DOGE")]
    #[case("polygon bridge scraper", "MATIC")]
    fn test_text_fallback(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(resolve_symbol(&named(name)), expected);
    }

    #[test]
    fn test_error_text_is_searched() {
        let run = Run {
            name: "zenrows_scraper".to_string(),
            error: Some("404 for https://coins.example/doge/".to_string()),
            ..Run::default()
        };
        assert_eq!(resolve_symbol(&run), "DOGE");
    }

    #[test]
    fn test_substring_inside_word_does_not_match() {
        // "SOLD" must not read as SOL, "DOTTED" not as DOT
        assert_eq!(resolve_symbol(&named("sold dotted items")), UNKNOWN_SYMBOL);
    }
}
