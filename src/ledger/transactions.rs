// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::error::LedgerError;
use crate::ledger::lots::{self, parse_stored_decimal};
use crate::ledger::settlement;
use crate::ledger::assets;
use crate::models::{RealizedGain, TaxLot, TradeSide, Transaction};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

/// One buy or sell to record.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub owner: String,
    pub symbol: String,
    pub class: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fees: Decimal,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// What a recorded trade produced: the transaction row plus its lot (buy)
/// or its realized gains (sell).
#[derive(Debug)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub lot: Option<TaxLot>,
    pub realized_gains: Vec<RealizedGain>,
}

fn validate(req: &TradeRequest) -> Result<(), LedgerError> {
    if req.quantity <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "Quantity must be positive, got {}",
            req.quantity
        )));
    }
    if req.price <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "Price must be positive, got {}",
            req.price
        )));
    }
    if req.fees < Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "Fees must not be negative, got {}",
            req.fees
        )));
    }
    Ok(())
}

/// Records a buy or sell as one atomic unit: the transaction row plus its
/// lot (buy) or its FIFO settlement (sell). On any failure, including
/// insufficient holdings, nothing is persisted.
pub fn record_transaction(
    conn: &mut Connection,
    req: &TradeRequest,
) -> Result<RecordedTransaction, LedgerError> {
    validate(req)?;

    // Resolver runs before the accounting unit; it is idempotent and
    // independent of the lot/gain tables.
    let asset_id = assets::resolve_or_create_asset(conn, &req.symbol, &req.class, None, "USD")?;

    let gross = req.quantity * req.price;
    let total_amount = match req.side {
        TradeSide::Buy => gross + req.fees,
        TradeSide::Sell => gross - req.fees,
    };

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO transactions(owner, asset_id, side, quantity, price, fees,
             total_amount, date, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            req.owner,
            asset_id,
            req.side.as_str(),
            req.quantity.to_string(),
            req.price.to_string(),
            req.fees.to_string(),
            total_amount.to_string(),
            req.date.to_string(),
            req.note
        ],
    )?;
    let transaction_id = tx.last_insert_rowid();

    let (lot, realized_gains) = match req.side {
        TradeSide::Buy => {
            let lot = lots::open_lot(
                &tx,
                &req.owner,
                transaction_id,
                asset_id,
                req.quantity,
                req.price,
                req.fees,
                req.date,
            )?;
            (Some(lot), Vec::new())
        }
        TradeSide::Sell => {
            let gains = settlement::settle_sale(
                &tx,
                &req.owner,
                transaction_id,
                asset_id,
                req.quantity,
                req.price,
                req.date,
            )?;
            (None, gains)
        }
    };
    tx.commit()?;

    Ok(RecordedTransaction {
        transaction: Transaction {
            id: transaction_id,
            owner: req.owner.clone(),
            asset_id,
            side: req.side,
            quantity: req.quantity,
            price: req.price,
            fees: req.fees,
            total_amount,
            date: req.date,
            note: req.note.clone(),
        },
        lot,
        realized_gains,
    })
}

type TxnRow = (
    i64,
    String,
    i64,
    String,
    String,
    String,
    String,
    String,
    NaiveDate,
    Option<String>,
);

const TXN_COLUMNS: &str =
    "id, owner, asset_id, side, quantity, price, fees, total_amount, date, note";

fn read_txn(r: &rusqlite::Row<'_>) -> rusqlite::Result<TxnRow> {
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
    ))
}

fn txn_from_row(row: TxnRow) -> Result<Transaction, LedgerError> {
    let (id, owner, asset_id, side_s, qty_s, price_s, fees_s, total_s, date, note) = row;
    let side = side_s
        .parse::<TradeSide>()
        .map_err(|e| LedgerError::invalid(e.to_string()))?;
    Ok(Transaction {
        id,
        owner,
        asset_id,
        side,
        quantity: parse_stored_decimal(&qty_s, "quantity")?,
        price: parse_stored_decimal(&price_s, "price")?,
        fees: parse_stored_decimal(&fees_s, "fees")?,
        total_amount: parse_stored_decimal(&total_s, "total amount")?,
        date,
        note,
    })
}

/// A transaction by id, scoped to its owner.
pub fn transaction_by_id(
    conn: &Connection,
    owner: &str,
    transaction_id: i64,
) -> Result<Transaction, LedgerError> {
    let row = conn
        .query_row(
            &format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id=?1 AND owner=?2"),
            params![transaction_id, owner],
            read_txn,
        )
        .optional()?;
    match row {
        Some(r) => txn_from_row(r),
        None => Err(LedgerError::NotFound {
            entity: "transaction",
            id: transaction_id,
        }),
    }
}

/// Deletes a transaction by reversing its ledger effects.
///
/// A buy goes only if its lot is untouched; otherwise the dependent sell
/// transactions are named and nothing changes. A sell restores every lot it
/// drained and removes its gain rows. Either way, one atomic unit.
pub fn delete_transaction(
    conn: &mut Connection,
    owner: &str,
    transaction_id: i64,
) -> Result<(), LedgerError> {
    let txn = transaction_by_id(conn, owner, transaction_id)?;

    let tx = conn.transaction()?;
    match txn.side {
        TradeSide::Buy => reverse_buy(&tx, &txn)?,
        TradeSide::Sell => reverse_sell(&tx, &txn)?,
    }
    tx.commit()?;
    Ok(())
}

fn reverse_buy(conn: &Connection, txn: &Transaction) -> Result<(), LedgerError> {
    let lot = lots::lot_for_buy(conn, txn.id)?.ok_or(LedgerError::NotFound {
        entity: "tax lot",
        id: txn.id,
    })?;

    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT sell_transaction_id FROM realized_gains
         WHERE lot_id=?1 ORDER BY sell_transaction_id",
    )?;
    let dependent_sells = stmt
        .query_map(params![lot.id], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if !dependent_sells.is_empty() {
        return Err(LedgerError::HasDependentSales {
            transaction_id: txn.id,
            dependent_sells,
        });
    }

    conn.execute("DELETE FROM tax_lots WHERE id=?1", params![lot.id])?;
    conn.execute("DELETE FROM transactions WHERE id=?1", params![txn.id])?;
    Ok(())
}

fn reverse_sell(conn: &Connection, txn: &Transaction) -> Result<(), LedgerError> {
    let gains = settlement::gains_for_sell(conn, txn.id)?;
    for gain in &gains {
        let lot = lots::lot_by_id(conn, gain.lot_id)?;
        // The gain's quantity came out of this lot's remaining, so the
        // restore cannot push it past original_quantity.
        lots::set_remaining(conn, lot.id, lot.remaining_quantity + gain.quantity)?;
    }
    conn.execute(
        "DELETE FROM realized_gains WHERE sell_transaction_id=?1",
        params![txn.id],
    )?;
    conn.execute("DELETE FROM transactions WHERE id=?1", params![txn.id])?;
    Ok(())
}

/// Transactions for an owner, newest first, optionally filtered by symbol.
pub fn list_transactions(
    conn: &Connection,
    owner: &str,
    symbol: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<(Transaction, String)>, LedgerError> {
    let mut sql = format!(
        "SELECT t.id, t.owner, t.asset_id, t.side, t.quantity, t.price, t.fees,
                t.total_amount, t.date, t.note, a.symbol
         FROM transactions t JOIN assets a ON t.asset_id=a.id
         WHERE t.owner=?1"
    );
    let mut params_vec: Vec<String> = vec![owner.to_string()];
    if let Some(sym) = symbol {
        sql.push_str(" AND a.symbol=?2");
        params_vec.push(sym.to_string());
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |r| {
        let raw = read_txn(r)?;
        let sym: String = r.get(10)?;
        Ok((raw, sym))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (raw, sym) = row?;
        out.push((txn_from_row(raw)?, sym));
    }
    Ok(out)
}
