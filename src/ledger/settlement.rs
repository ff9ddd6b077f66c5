// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::error::LedgerError;
use crate::ledger::lots::{self, parse_stored_decimal};
use crate::models::RealizedGain;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

/// Raw day count for long-term treatment: one year plus a day. Kept as a day
/// count rather than calendar arithmetic; see DESIGN.md.
pub const LONG_TERM_MIN_DAYS: i64 = 366;

/// Matches a sell against the owner's open lots for the asset, oldest
/// purchase first, emitting one realized-gain row per lot drawn from and
/// decrementing each lot as it goes.
///
/// Must run inside the caller's transaction scope: on
/// `InsufficientHoldings` the staged lot decrements and gain rows are
/// discarded by the rollback.
pub fn settle_sale(
    conn: &Connection,
    owner: &str,
    sell_transaction_id: i64,
    asset_id: i64,
    quantity: Decimal,
    price: Decimal,
    sale_date: NaiveDate,
) -> Result<Vec<RealizedGain>, LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "Sell quantity must be positive, got {}",
            quantity
        )));
    }

    let open = lots::open_lots(conn, owner, asset_id)?;
    let available: Decimal = open.iter().map(|l| l.remaining_quantity).sum();

    let mut remaining_to_sell = quantity;
    let mut gains = Vec::new();
    for lot in open {
        if remaining_to_sell.is_zero() {
            break;
        }
        let draw = remaining_to_sell.min(lot.remaining_quantity);
        let cost_basis = draw * lot.cost_basis_per_unit;
        let proceeds = draw * price;
        let gain_loss = proceeds - cost_basis;
        let holding_days = (sale_date - lot.purchase_date).num_days();
        let long_term = holding_days >= LONG_TERM_MIN_DAYS;

        conn.execute(
            "INSERT INTO realized_gains(owner, sell_transaction_id, lot_id, asset_id,
                 quantity, cost_basis, proceeds, gain_loss, holding_days, long_term, sale_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                owner,
                sell_transaction_id,
                lot.id,
                asset_id,
                draw.to_string(),
                cost_basis.to_string(),
                proceeds.to_string(),
                gain_loss.to_string(),
                holding_days,
                long_term,
                sale_date.to_string()
            ],
        )?;
        let gain_id = conn.last_insert_rowid();
        lots::set_remaining(conn, lot.id, lot.remaining_quantity - draw)?;

        gains.push(RealizedGain {
            id: gain_id,
            owner: owner.to_string(),
            sell_transaction_id,
            lot_id: lot.id,
            asset_id,
            quantity: draw,
            cost_basis,
            proceeds,
            gain_loss,
            holding_days,
            long_term,
            sale_date,
        });
        remaining_to_sell -= draw;
    }

    if !remaining_to_sell.is_zero() {
        let symbol: String = conn.query_row(
            "SELECT symbol FROM assets WHERE id=?1",
            params![asset_id],
            |r| r.get(0),
        )?;
        return Err(LedgerError::InsufficientHoldings {
            symbol,
            requested: quantity,
            available,
        });
    }

    Ok(gains)
}

type GainRow = (
    i64,
    String,
    i64,
    i64,
    i64,
    String,
    String,
    String,
    String,
    i64,
    bool,
    NaiveDate,
);

pub(crate) const GAIN_COLUMNS: &str =
    "id, owner, sell_transaction_id, lot_id, asset_id, quantity, cost_basis, \
     proceeds, gain_loss, holding_days, long_term, sale_date";

pub(crate) fn read_gain(r: &rusqlite::Row<'_>) -> rusqlite::Result<GainRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
        r.get(9)?,
        r.get(10)?,
        r.get(11)?,
    ))
}

pub(crate) fn gain_from_row(row: GainRow) -> Result<RealizedGain, LedgerError> {
    let (id, owner, sell_transaction_id, lot_id, asset_id, qty_s, cb_s, pr_s, gl_s, holding_days, long_term, sale_date) =
        row;
    Ok(RealizedGain {
        id,
        owner,
        sell_transaction_id,
        lot_id,
        asset_id,
        quantity: parse_stored_decimal(&qty_s, "gain quantity")?,
        cost_basis: parse_stored_decimal(&cb_s, "cost basis")?,
        proceeds: parse_stored_decimal(&pr_s, "proceeds")?,
        gain_loss: parse_stored_decimal(&gl_s, "gain/loss")?,
        holding_days,
        long_term,
        sale_date,
    })
}

/// Every realized-gain row a sell transaction produced, in emission order.
pub fn gains_for_sell(
    conn: &Connection,
    sell_transaction_id: i64,
) -> Result<Vec<RealizedGain>, LedgerError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {GAIN_COLUMNS} FROM realized_gains WHERE sell_transaction_id=?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![sell_transaction_id], read_gain)?;
    let mut gains = Vec::new();
    for row in rows {
        gains.push(gain_from_row(row?)?);
    }
    Ok(gains)
}
