// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::transactions::{
    delete_transaction, list_transactions, record_transaction, TradeRequest,
};
use crate::models::TradeSide;
use crate::utils::{fmt_money, maybe_print_json, normalize_symbol, parse_date, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("buy", sub)) => record(conn, sub, TradeSide::Buy)?,
        Some(("sell", sub)) => record(conn, sub, TradeSide::Sell)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => remove(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn request_from_matches(sub: &clap::ArgMatches, side: TradeSide) -> Result<TradeRequest> {
    let owner = sub.get_one::<String>("owner").unwrap().trim().to_string();
    let date = parse_date(sub.get_one::<String>("date").unwrap().trim())?;
    let symbol = normalize_symbol(sub.get_one::<String>("symbol").unwrap())?;
    let class = sub.get_one::<String>("class").unwrap().trim().to_lowercase();
    let quantity = parse_decimal(sub.get_one::<String>("quantity").unwrap().trim())?;
    let price = parse_decimal(sub.get_one::<String>("price").unwrap().trim())?;
    let fees = match sub.get_one::<String>("fees") {
        Some(raw) => parse_decimal(raw.trim())?,
        None => Decimal::ZERO,
    };
    let note = sub.get_one::<String>("note").map(|s| s.to_string());
    Ok(TradeRequest {
        owner,
        symbol,
        class,
        side,
        quantity,
        price,
        fees,
        date,
        note,
    })
}

fn record(conn: &mut Connection, sub: &clap::ArgMatches, side: TradeSide) -> Result<()> {
    let req = request_from_matches(sub, side)?;
    let rec = record_transaction(conn, &req)?;

    println!(
        "Recorded {} #{}: {} x {} @ {} (fees {})",
        side, rec.transaction.id, req.quantity, req.symbol, req.price, req.fees
    );
    if let Some(lot) = &rec.lot {
        println!(
            "Opened lot #{} with cost basis {}/unit",
            lot.id,
            fmt_money(&lot.cost_basis_per_unit)
        );
    }
    if !rec.realized_gains.is_empty() {
        let rows = rec
            .realized_gains
            .iter()
            .map(|g| {
                vec![
                    g.lot_id.to_string(),
                    format!("{}", g.quantity),
                    fmt_money(&g.cost_basis),
                    fmt_money(&g.proceeds),
                    fmt_money(&g.gain_loss),
                    g.holding_days.to_string(),
                    if g.long_term { "long" } else { "short" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Lot", "Qty", "Cost Basis", "Proceeds", "Gain/Loss", "Days", "Term"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub symbol: String,
    pub side: String,
    pub quantity: String,
    pub price: String,
    pub fees: String,
    pub total_amount: String,
    pub note: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let symbol = sub.get_one::<String>("symbol").map(|s| s.as_str());
    let limit = sub.get_one::<usize>("limit").copied();
    let rows = list_transactions(conn, owner, symbol, limit)?;
    Ok(rows
        .into_iter()
        .map(|(t, sym)| TransactionRow {
            id: t.id,
            date: t.date.to_string(),
            symbol: sym,
            side: t.side.to_string(),
            quantity: t.quantity.to_string(),
            price: t.price.to_string(),
            fees: t.fees.to_string(),
            total_amount: t.total_amount.to_string(),
            note: t.note.unwrap_or_default(),
        })
        .collect())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.symbol.clone(),
                    r.side.clone(),
                    r.quantity.clone(),
                    r.price.clone(),
                    r.fees.clone(),
                    r.total_amount.clone(),
                    r.note.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Symbol", "Side", "Qty", "Price", "Fees", "Total", "Note"],
                rows,
            )
        );
    }
    Ok(())
}

fn remove(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let id = *sub.get_one::<i64>("id").unwrap();
    delete_transaction(conn, owner, id)?;
    println!("Deleted transaction #{} and reversed its ledger effects", id);
    Ok(())
}
