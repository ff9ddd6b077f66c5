// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::error::LedgerError;
use crate::models::Asset;
use rusqlite::{params, Connection, OptionalExtension};

/// Returns the id for (symbol, class), inserting the asset if unseen.
/// Idempotent; safe to call repeatedly with the same pair.
pub fn resolve_or_create_asset(
    conn: &Connection,
    symbol: &str,
    class: &str,
    name: Option<&str>,
    currency: &str,
) -> Result<i64, LedgerError> {
    if let Some(id) = lookup_asset(conn, symbol, class)? {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO assets(symbol, class, name, currency) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(symbol, class) DO NOTHING",
        params![symbol, class, name, currency],
    )?;
    lookup_asset(conn, symbol, class)?.ok_or(LedgerError::NotFound {
        entity: "asset",
        id: 0,
    })
}

pub fn lookup_asset(
    conn: &Connection,
    symbol: &str,
    class: &str,
) -> Result<Option<i64>, LedgerError> {
    let id = conn
        .query_row(
            "SELECT id FROM assets WHERE symbol=?1 AND class=?2",
            params![symbol, class],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn asset_by_id(conn: &Connection, asset_id: i64) -> Result<Asset, LedgerError> {
    conn.query_row(
        "SELECT id, symbol, class, name, currency FROM assets WHERE id=?1",
        params![asset_id],
        |r| {
            Ok(Asset {
                id: r.get(0)?,
                symbol: r.get(1)?,
                class: r.get(2)?,
                name: r.get(3)?,
                currency: r.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or(LedgerError::NotFound {
        entity: "asset",
        id: asset_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE assets(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                class TEXT NOT NULL,
                name TEXT,
                currency TEXT NOT NULL DEFAULT 'USD',
                UNIQUE(symbol, class)
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn resolve_is_idempotent_by_symbol_and_class() {
        let conn = conn();
        let a = resolve_or_create_asset(&conn, "VTI", "etf", Some("Vanguard Total"), "USD").unwrap();
        let b = resolve_or_create_asset(&conn, "VTI", "etf", None, "USD").unwrap();
        assert_eq!(a, b);

        // Same symbol, different class is a distinct asset
        let c = resolve_or_create_asset(&conn, "VTI", "stock", None, "USD").unwrap();
        assert_ne!(a, c);
    }
}
