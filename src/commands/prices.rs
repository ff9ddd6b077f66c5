// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{http_client, normalize_symbol, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", _)) => fetch_prices(conn),
        Some(("set", sub)) => set_price(conn, sub),
        Some(("list", _)) => list_prices(conn),
        _ => Ok(()),
    }
}

/// Latest stored price per symbol. Symbols with no quote are simply absent;
/// the unrealized report treats them as indeterminate.
pub fn latest_prices(conn: &Connection) -> Result<HashMap<String, Decimal>> {
    let mut stmt = conn.prepare_cached(
        "SELECT a.symbol, p.price FROM (
             SELECT asset_id,
                    price,
                    ROW_NUMBER() OVER (
                        PARTITION BY asset_id
                        ORDER BY as_of DESC, rowid DESC
                    ) AS rn
             FROM prices
         ) p JOIN assets a ON p.asset_id=a.id
         WHERE p.rn = 1",
    )?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;
    let mut prices = HashMap::new();
    for row in rows {
        let (symbol, price_s) = row?;
        let price = Decimal::from_str_exact(&price_s)
            .with_context(|| format!("Invalid stored price '{}' for {}", price_s, symbol))?;
        prices.insert(symbol, price);
    }
    Ok(prices)
}

fn set_price(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let symbol = normalize_symbol(sub.get_one::<String>("symbol").unwrap())?;
    let price = parse_decimal(sub.get_one::<String>("price").unwrap().trim())?;
    let as_of = match sub.get_one::<String>("date") {
        Some(d) => crate::utils::parse_date(d.trim())?.to_string(),
        None => Utc::now().to_rfc3339(),
    };

    let mut stmt = conn.prepare("SELECT id FROM assets WHERE symbol=?1")?;
    let ids = stmt
        .query_map(params![symbol], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if ids.is_empty() {
        anyhow::bail!("Asset '{}' not found", symbol);
    }
    for asset_id in &ids {
        conn.execute(
            "INSERT INTO prices(asset_id, as_of, price, source) VALUES (?1, ?2, ?3, 'manual')
             ON CONFLICT(asset_id, as_of) DO UPDATE SET price=excluded.price, source='manual'",
            params![asset_id, &as_of, price.to_string()],
        )?;
    }
    println!("Set {} = {} as of {}", symbol, price, as_of);
    Ok(())
}

fn list_prices(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT a.symbol, p.as_of, p.price, p.source
         FROM prices p JOIN assets a ON p.asset_id=a.id
         ORDER BY p.as_of DESC LIMIT 50",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (sym, ts, px, src) = row?;
        data.push(vec![sym, ts, px, src]);
    }
    println!(
        "{}",
        pretty_table(&["Symbol", "As Of", "Price", "Source"], data)
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct YahooResponse {
    quoteResponse: QuoteResponse,
}
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct QuoteResponse {
    result: Vec<YahooQuote>,
}
#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    symbol: Option<String>,
    #[serde(rename = "currency")]
    _currency: Option<String>,
}

pub fn fetch_prices(conn: &mut Connection) -> Result<()> {
    let mut stmt = conn.prepare_cached("SELECT id, symbol FROM assets ORDER BY symbol")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;

    let mut assets = Vec::new();
    for row in rows {
        assets.push(row?);
    }

    drop(stmt);

    if assets.is_empty() {
        println!("No assets to fetch");
        return Ok(());
    }

    let symbols = assets
        .iter()
        .map(|(_, symbol)| symbol.as_str())
        .collect::<Vec<_>>();
    let url = format!(
        "https://query1.finance.yahoo.com/v7/finance/quote?symbols={}",
        symbols.join(",")
    );
    let client = http_client()?;
    let resp = client.get(url).send()?.error_for_status()?;
    let yr: YahooResponse = resp.json()?;

    let mut ids_by_symbol: HashMap<&str, Vec<i64>> = HashMap::with_capacity(assets.len());
    for (id, symbol) in &assets {
        ids_by_symbol.entry(symbol.as_str()).or_default().push(*id);
    }

    let mut updates = Vec::with_capacity(yr.quoteResponse.result.len());
    for q in yr.quoteResponse.result {
        if let (Some(sym), Some(px)) = (q.symbol, q.regular_market_price) {
            if let Some(asset_ids) = ids_by_symbol.get(sym.as_str()) {
                if let Some(px_decimal) = Decimal::from_f64_retain(px) {
                    for asset_id in asset_ids {
                        updates.push((*asset_id, px_decimal.to_string()));
                    }
                }
            }
        }
    }

    let now = Utc::now().to_rfc3339();
    if updates.is_empty() {
        println!("No Yahoo prices updated at {}", now);
        return Ok(());
    }

    let total_updates = updates.len();

    let tx = conn.transaction()?;
    let mut insert = tx.prepare_cached(
        "INSERT INTO prices(asset_id, as_of, price, source) VALUES (?1, ?2, ?3, 'yahoo')",
    )?;
    for (asset_id, price) in updates {
        insert.execute(params![asset_id, &now, price])?;
    }
    drop(insert);
    tx.commit()?;

    println!("Fetched {} prices at {}", total_updates, now);
    Ok(())
}
