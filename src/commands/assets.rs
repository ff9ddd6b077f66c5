// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::assets::resolve_or_create_asset;
use crate::utils::{normalize_symbol, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let symbol = normalize_symbol(sub.get_one::<String>("symbol").unwrap())?;
            let class = sub.get_one::<String>("class").unwrap().trim().to_lowercase();
            let name = sub.get_one::<String>("name").map(|s| s.trim().to_string());
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            resolve_or_create_asset(conn, &symbol, &class, name.as_deref(), &ccy)?;
            println!("Added asset {} ({})", symbol, class);
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare(
                "SELECT symbol, class, name, currency FROM assets ORDER BY symbol, class",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (sym, class, name, ccy) = row?;
                data.push(vec![sym, class, name.unwrap_or_default(), ccy]);
            }
            println!(
                "{}",
                pretty_table(&["Symbol", "Class", "Name", "CCY"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
