// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::error::LedgerError;
use crate::models::{Asset, TaxLot};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub(crate) fn parse_stored_decimal(s: &str, what: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str_exact(s)
        .map_err(|_| LedgerError::invalid(format!("Invalid stored {} '{}'", what, s)))
}

type LotRow = (i64, String, i64, i64, String, String, String, NaiveDate);

const LOT_COLUMNS: &str = "id, owner, asset_id, buy_transaction_id, original_quantity, \
     remaining_quantity, cost_basis_per_unit, purchase_date";

fn read_lot(r: &rusqlite::Row<'_>) -> rusqlite::Result<LotRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
    ))
}

fn lot_from_row(row: LotRow) -> Result<TaxLot, LedgerError> {
    let (id, owner, asset_id, buy_transaction_id, orig_s, rem_s, cb_s, purchase_date) = row;
    Ok(TaxLot {
        id,
        owner,
        asset_id,
        buy_transaction_id,
        original_quantity: parse_stored_decimal(&orig_s, "lot quantity")?,
        remaining_quantity: parse_stored_decimal(&rem_s, "lot quantity")?,
        cost_basis_per_unit: parse_stored_decimal(&cb_s, "cost basis")?,
        purchase_date,
    })
}

/// Opens the cost-basis lot for a buy. Fees are folded into the per-unit
/// basis: (quantity * price + fees) / quantity.
pub fn open_lot(
    conn: &Connection,
    owner: &str,
    buy_transaction_id: i64,
    asset_id: i64,
    quantity: Decimal,
    price: Decimal,
    fees: Decimal,
    purchase_date: NaiveDate,
) -> Result<TaxLot, LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "Lot quantity must be positive, got {}",
            quantity
        )));
    }
    let cost_basis_per_unit = (quantity * price + fees) / quantity;
    conn.execute(
        "INSERT INTO tax_lots(owner, asset_id, buy_transaction_id, original_quantity,
             remaining_quantity, cost_basis_per_unit, purchase_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            owner,
            asset_id,
            buy_transaction_id,
            quantity.to_string(),
            quantity.to_string(),
            cost_basis_per_unit.to_string(),
            purchase_date.to_string()
        ],
    )?;
    Ok(TaxLot {
        id: conn.last_insert_rowid(),
        owner: owner.to_string(),
        asset_id,
        buy_transaction_id,
        original_quantity: quantity,
        remaining_quantity: quantity,
        cost_basis_per_unit,
        purchase_date,
    })
}

/// Lots with quantity left for (owner, asset), oldest purchase first.
/// Same-day purchases resolve by lot id, i.e. insertion order.
pub fn open_lots(conn: &Connection, owner: &str, asset_id: i64) -> Result<Vec<TaxLot>, LedgerError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {LOT_COLUMNS} FROM tax_lots
         WHERE owner=?1 AND asset_id=?2
         ORDER BY purchase_date, id"
    ))?;
    let rows = stmt.query_map(params![owner, asset_id], read_lot)?;
    let mut lots = Vec::new();
    for row in rows {
        let lot = lot_from_row(row?)?;
        if !lot.remaining_quantity.is_zero() {
            lots.push(lot);
        }
    }
    Ok(lots)
}

pub fn lot_by_id(conn: &Connection, lot_id: i64) -> Result<TaxLot, LedgerError> {
    let row = conn
        .query_row(
            &format!("SELECT {LOT_COLUMNS} FROM tax_lots WHERE id=?1"),
            params![lot_id],
            read_lot,
        )
        .optional()?;
    match row {
        Some(r) => lot_from_row(r),
        None => Err(LedgerError::NotFound {
            entity: "tax lot",
            id: lot_id,
        }),
    }
}

/// The lot a buy transaction opened, if it still exists.
pub fn lot_for_buy(
    conn: &Connection,
    buy_transaction_id: i64,
) -> Result<Option<TaxLot>, LedgerError> {
    let row = conn
        .query_row(
            &format!("SELECT {LOT_COLUMNS} FROM tax_lots WHERE buy_transaction_id=?1"),
            params![buy_transaction_id],
            read_lot,
        )
        .optional()?;
    row.map(lot_from_row).transpose()
}

pub(crate) fn set_remaining(
    conn: &Connection,
    lot_id: i64,
    remaining: Decimal,
) -> Result<(), LedgerError> {
    let n = conn.execute(
        "UPDATE tax_lots SET remaining_quantity=?1 WHERE id=?2",
        params![remaining.to_string(), lot_id],
    )?;
    if n == 0 {
        return Err(LedgerError::NotFound {
            entity: "tax lot",
            id: lot_id,
        });
    }
    Ok(())
}

/// Flat lot listing for an owner, joined with its asset. Exhausted lots are
/// skipped unless asked for.
pub fn lots_with_assets(
    conn: &Connection,
    owner: &str,
    include_exhausted: bool,
) -> Result<Vec<(Asset, TaxLot)>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT a.id, a.symbol, a.class, a.name, a.currency,
                l.id, l.owner, l.asset_id, l.buy_transaction_id, l.original_quantity,
                l.remaining_quantity, l.cost_basis_per_unit, l.purchase_date
         FROM tax_lots l JOIN assets a ON l.asset_id=a.id
         WHERE l.owner=?1
         ORDER BY a.symbol, l.purchase_date, l.id",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        let asset = Asset {
            id: r.get(0)?,
            symbol: r.get(1)?,
            class: r.get(2)?,
            name: r.get(3)?,
            currency: r.get(4)?,
        };
        let lot: LotRow = (
            r.get(5)?,
            r.get(6)?,
            r.get(7)?,
            r.get(8)?,
            r.get(9)?,
            r.get(10)?,
            r.get(11)?,
            r.get(12)?,
        );
        Ok((asset, lot))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (asset, raw) = row?;
        let lot = lot_from_row(raw)?;
        if include_exhausted || !lot.is_exhausted() {
            out.push((asset, lot));
        }
    }
    Ok(out)
}
