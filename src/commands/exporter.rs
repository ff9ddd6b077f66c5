// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        Some(("gains", sub)) => export_gains(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT t.date, a.symbol, a.class, t.side, t.quantity, t.price, t.fees,
                t.total_amount, t.note
         FROM transactions t JOIN assets a ON t.asset_id=a.id
         WHERE t.owner=?1
         ORDER BY t.date, t.id",
    )?;
    let rows = stmt.query_map([owner], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, Option<String>>(8)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date", "symbol", "class", "side", "quantity", "price", "fees", "total", "note",
            ])?;
            for row in rows {
                let (d, sym, class, side, qty, price, fees, total, note) = row?;
                wtr.write_record([
                    d,
                    sym,
                    class,
                    side,
                    qty,
                    price,
                    fees,
                    total,
                    note.unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (d, sym, class, side, qty, price, fees, total, note) = row?;
                items.push(json!({
                    "date": d, "symbol": sym, "class": class, "side": side,
                    "quantity": qty, "price": price, "fees": fees, "total": total, "note": note
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported transactions to {}", out);
    Ok(())
}

fn export_gains(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    let year = sub.get_one::<String>("year").map(|s| s.trim().to_string());

    let mut sql = String::from(
        "SELECT g.sale_date, a.symbol, g.quantity, g.cost_basis, g.proceeds, g.gain_loss,
                g.holding_days, g.long_term, g.sell_transaction_id, g.lot_id
         FROM realized_gains g JOIN assets a ON g.asset_id=a.id
         WHERE g.owner=?1",
    );
    if year.is_some() {
        sql.push_str(" AND substr(g.sale_date,1,4)=?2");
    }
    sql.push_str(" ORDER BY g.sale_date, g.id");

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
            r.get::<_, bool>(7)?,
            r.get::<_, i64>(8)?,
            r.get::<_, i64>(9)?,
        ))
    };
    let rows = match &year {
        Some(y) => stmt.query_map(rusqlite::params![owner, y], map_row)?,
        None => stmt.query_map(rusqlite::params![owner], map_row)?,
    };

    let mut collected = Vec::new();
    for row in rows {
        collected.push(row?);
    }

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "sale_date",
                "symbol",
                "quantity",
                "cost_basis",
                "proceeds",
                "gain_loss",
                "holding_days",
                "term",
                "sell_transaction_id",
                "lot_id",
            ])?;
            for (d, sym, qty, cb, pr, gl, days, long_term, sell_id, lot_id) in collected {
                wtr.write_record([
                    d,
                    sym,
                    qty,
                    cb,
                    pr,
                    gl,
                    days.to_string(),
                    if long_term { "long" } else { "short" }.to_string(),
                    sell_id.to_string(),
                    lot_id.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = collected
                .into_iter()
                .map(|(d, sym, qty, cb, pr, gl, days, long_term, sell_id, lot_id)| {
                    json!({
                        "sale_date": d, "symbol": sym, "quantity": qty,
                        "cost_basis": cb, "proceeds": pr, "gain_loss": gl,
                        "holding_days": days, "long_term": long_term,
                        "sell_transaction_id": sell_id, "lot_id": lot_id
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported realized gains to {}", out);
    Ok(())
}
