// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

const UA: &str = concat!(
    "lotbook/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/lotbook)"
);

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9.\-]{1,12}$").unwrap());

/// Uppercases and validates a ticker symbol.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let sym = raw.trim().to_uppercase();
    if !SYMBOL_RE.is_match(&sym) {
        return Err(anyhow::anyhow!(
            "Invalid symbol '{}', expected 1-12 of A-Z, 0-9, '.', '-'",
            raw
        ));
    }
    Ok(sym)
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_symbol_uppercases_and_trims() {
        assert_eq!(normalize_symbol(" brk.b ").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("btc-usd").unwrap(), "BTC-USD");
    }

    #[test]
    fn normalize_symbol_rejects_garbage() {
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("TOO_LONG_SYMBOL").is_err());
        assert!(normalize_symbol("A B").is_err());
    }
}
