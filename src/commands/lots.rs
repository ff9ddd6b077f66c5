// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::lots::lots_with_assets;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Serialize)]
pub struct LotRow {
    pub id: i64,
    pub symbol: String,
    pub purchase_date: String,
    pub original_quantity: String,
    pub remaining_quantity: String,
    pub cost_basis_per_unit: String,
    pub remaining_cost_basis: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<LotRow>> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let include_exhausted = sub.get_flag("all");
    let lots = lots_with_assets(conn, owner, include_exhausted)?;
    Ok(lots
        .into_iter()
        .map(|(asset, lot)| LotRow {
            id: lot.id,
            symbol: asset.symbol,
            purchase_date: lot.purchase_date.to_string(),
            original_quantity: lot.original_quantity.to_string(),
            remaining_quantity: lot.remaining_quantity.to_string(),
            cost_basis_per_unit: lot.cost_basis_per_unit.to_string(),
            remaining_cost_basis: fmt_money(&lot.remaining_cost_basis()),
        })
        .collect())
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let json_flag = m.get_flag("json");
    let jsonl_flag = m.get_flag("jsonl");
    let data = query_rows(conn, m)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.symbol.clone(),
                    r.purchase_date.clone(),
                    r.original_quantity.clone(),
                    r.remaining_quantity.clone(),
                    r.cost_basis_per_unit.clone(),
                    r.remaining_cost_basis.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Lot", "Symbol", "Purchased", "Original", "Remaining", "Basis/Unit", "Basis"],
                rows,
            )
        );
    }
    Ok(())
}
