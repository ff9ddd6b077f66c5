// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::transactions::{record_transaction, TradeRequest};
use crate::models::TradeSide;
use crate::utils::{normalize_symbol, parse_date, parse_decimal};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("trades", sub)) => import_trades(conn, sub),
        _ => Ok(()),
    }
}

/// Replays CSV rows (date,symbol,class,side,quantity,price,fees,note) through
/// the ledger, so every row gets the same lot/settlement treatment as a CLI
/// trade. Each row commits on its own; a bad row stops the import and names
/// its line number, leaving earlier rows recorded.
fn import_trades(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let owner = sub.get_one::<String>("owner").unwrap().trim().to_string();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let mut buys = 0usize;
    let mut sells = 0usize;
    for (idx, result) in rdr.records().enumerate() {
        let line = idx + 2; // header is line 1
        let rec = result?;
        let date_raw = rec.get(0).context("date missing")?.trim();
        let symbol_raw = rec.get(1).context("symbol missing")?;
        let class = rec.get(2).context("class missing")?.trim().to_lowercase();
        let side_raw = rec.get(3).context("side missing")?.trim().to_lowercase();
        let qty_raw = rec.get(4).context("quantity missing")?.trim();
        let price_raw = rec.get(5).context("price missing")?.trim();
        let fees_raw = rec.get(6).map(|s| s.trim()).unwrap_or("");
        let note = rec
            .get(7)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let side = side_raw
            .parse::<TradeSide>()
            .with_context(|| format!("Invalid side '{}' at line {}", side_raw, line))?;
        let req = TradeRequest {
            owner: owner.clone(),
            symbol: normalize_symbol(symbol_raw)
                .with_context(|| format!("Invalid symbol at line {}", line))?,
            class,
            side,
            quantity: parse_decimal(qty_raw)
                .with_context(|| format!("Invalid quantity at line {}", line))?,
            price: parse_decimal(price_raw)
                .with_context(|| format!("Invalid price at line {}", line))?,
            fees: if fees_raw.is_empty() {
                Decimal::ZERO
            } else {
                parse_decimal(fees_raw).with_context(|| format!("Invalid fees at line {}", line))?
            },
            date: parse_date(date_raw).with_context(|| format!("Invalid date at line {}", line))?,
            note,
        };

        record_transaction(conn, &req).with_context(|| format!("Trade at line {}", line))?;
        match side {
            TradeSide::Buy => buys += 1,
            TradeSide::Sell => sells += 1,
        }
    }

    println!("Imported {} buys and {} sells from {}", buys, sells, path);
    Ok(())
}
