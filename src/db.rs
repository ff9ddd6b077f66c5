// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Lotbook", "lotbook"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("lotbook.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    open_at(&path)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("Open in-memory DB")?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS assets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        class TEXT NOT NULL,
        name TEXT,
        currency TEXT NOT NULL DEFAULT 'USD',
        UNIQUE(symbol, class)
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        asset_id INTEGER NOT NULL,
        side TEXT NOT NULL CHECK(side IN ('buy','sell')),
        quantity TEXT NOT NULL,
        price TEXT NOT NULL,
        fees TEXT NOT NULL DEFAULT '0',
        total_amount TEXT NOT NULL,
        date TEXT NOT NULL,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(asset_id) REFERENCES assets(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_owner_date ON transactions(owner, date);

    -- One lot per buy transaction. remaining_quantity is drained by sells
    -- and restored by sell reversals; it never exceeds original_quantity.
    CREATE TABLE IF NOT EXISTS tax_lots(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        asset_id INTEGER NOT NULL,
        buy_transaction_id INTEGER NOT NULL,
        original_quantity TEXT NOT NULL,
        remaining_quantity TEXT NOT NULL,
        cost_basis_per_unit TEXT NOT NULL,
        purchase_date TEXT NOT NULL,
        FOREIGN KEY(asset_id) REFERENCES assets(id),
        FOREIGN KEY(buy_transaction_id) REFERENCES transactions(id)
    );
    CREATE INDEX IF NOT EXISTS idx_tax_lots_fifo ON tax_lots(owner, asset_id, purchase_date, id);

    CREATE TABLE IF NOT EXISTS realized_gains(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        sell_transaction_id INTEGER NOT NULL,
        lot_id INTEGER NOT NULL,
        asset_id INTEGER NOT NULL,
        quantity TEXT NOT NULL,
        cost_basis TEXT NOT NULL,
        proceeds TEXT NOT NULL,
        gain_loss TEXT NOT NULL,
        holding_days INTEGER NOT NULL,
        long_term INTEGER NOT NULL,
        sale_date TEXT NOT NULL,
        FOREIGN KEY(sell_transaction_id) REFERENCES transactions(id),
        FOREIGN KEY(lot_id) REFERENCES tax_lots(id),
        FOREIGN KEY(asset_id) REFERENCES assets(id)
    );
    CREATE INDEX IF NOT EXISTS idx_realized_gains_owner_date ON realized_gains(owner, sale_date);
    CREATE INDEX IF NOT EXISTS idx_realized_gains_sell ON realized_gains(sell_transaction_id);

    CREATE TABLE IF NOT EXISTS prices(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        asset_id INTEGER NOT NULL,
        as_of TEXT NOT NULL,
        price TEXT NOT NULL,
        source TEXT NOT NULL,
        UNIQUE(asset_id, as_of),
        FOREIGN KEY(asset_id) REFERENCES assets(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
