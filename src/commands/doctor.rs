// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;

fn dec(s: &str, what: &str) -> Result<Decimal> {
    Decimal::from_str_exact(s).with_context(|| format!("Invalid stored {} '{}'", what, s))
}

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Lot bounds: 0 <= remaining <= original
    let mut stmt = conn.prepare(
        "SELECT id, original_quantity, remaining_quantity FROM tax_lots ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let original = dec(&r.get::<_, String>(1)?, "lot quantity")?;
        let remaining = dec(&r.get::<_, String>(2)?, "lot quantity")?;
        if remaining < Decimal::ZERO || remaining > original {
            rows.push(vec![
                "lot_out_of_bounds".into(),
                format!("lot {} remaining {} of {}", id, remaining, original),
            ]);
        }
    }

    // 2) Conservation per lot: original - remaining == quantity realized from it
    let mut consumed: HashMap<i64, Decimal> = HashMap::new();
    let mut stmt = conn.prepare("SELECT lot_id, quantity FROM realized_gains")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let lot_id: i64 = r.get(0)?;
        let qty = dec(&r.get::<_, String>(1)?, "gain quantity")?;
        *consumed.entry(lot_id).or_insert(Decimal::ZERO) += qty;
    }
    let mut stmt = conn.prepare(
        "SELECT id, original_quantity, remaining_quantity FROM tax_lots ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let original = dec(&r.get::<_, String>(1)?, "lot quantity")?;
        let remaining = dec(&r.get::<_, String>(2)?, "lot quantity")?;
        let sold = consumed.get(&id).copied().unwrap_or(Decimal::ZERO);
        if original - remaining != sold {
            rows.push(vec![
                "lot_conservation".into(),
                format!("lot {} drained {} but gains total {}", id, original - remaining, sold),
            ]);
        }
    }

    // 3) Per-sell settlement: gains must cover the transaction's quantity
    let mut stmt = conn.prepare(
        "SELECT t.id, t.quantity, IFNULL((
             SELECT GROUP_CONCAT(g.quantity, '|') FROM realized_gains g
             WHERE g.sell_transaction_id=t.id
         ), '') FROM transactions t WHERE t.side='sell' ORDER BY t.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let qty = dec(&r.get::<_, String>(1)?, "quantity")?;
        let parts: String = r.get(2)?;
        let mut settled = Decimal::ZERO;
        for p in parts.split('|').filter(|p| !p.is_empty()) {
            settled += dec(p, "gain quantity")?;
        }
        if settled != qty {
            rows.push(vec![
                "sell_not_fully_settled".into(),
                format!("sell {} for {} but gains total {}", id, qty, settled),
            ]);
        }
    }

    // 4) Buys must still own their lot; references must resolve
    for (issue, sql) in [
        (
            "buy_without_lot",
            "SELECT t.id FROM transactions t
             WHERE t.side='buy'
               AND NOT EXISTS (SELECT 1 FROM tax_lots l WHERE l.buy_transaction_id=t.id)",
        ),
        (
            "lot_without_buy",
            "SELECT l.id FROM tax_lots l
             WHERE NOT EXISTS (SELECT 1 FROM transactions t WHERE t.id=l.buy_transaction_id)",
        ),
        (
            "gain_without_sell",
            "SELECT g.id FROM realized_gains g
             WHERE NOT EXISTS (SELECT 1 FROM transactions t WHERE t.id=g.sell_transaction_id)",
        ),
        (
            "gain_without_lot",
            "SELECT g.id FROM realized_gains g
             WHERE NOT EXISTS (SELECT 1 FROM tax_lots l WHERE l.id=g.lot_id)",
        ),
    ] {
        let mut stmt = conn.prepare(sql)?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            rows.push(vec![issue.into(), format!("id {}", id)]);
        }
    }

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
