// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::prices::{fetch_prices, latest_prices};
use crate::ledger::reports::{cost_basis_report, tax_summary, unrealized_gains};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("cost-basis", sub)) => cost_basis(conn, sub)?,
        Some(("unrealized", sub)) => unrealized(conn, sub)?,
        Some(("tax", sub)) => tax(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn cost_basis(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");

    let report = cost_basis_report(conn, owner)?;
    if !maybe_print_json(json_flag, jsonl_flag, &report)? {
        let rows = report
            .iter()
            .map(|line| {
                vec![
                    line.class.clone(),
                    line.lots.to_string(),
                    fmt_money(&line.cost_basis),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Class", "Lots", "Cost Basis"], rows));
    }
    Ok(())
}

fn unrealized(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    if sub.get_flag("live") {
        fetch_prices(conn)?;
    }
    let owner = sub.get_one::<String>("owner").unwrap();
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");

    let prices = latest_prices(conn)?;
    let today = chrono::Utc::now().date_naive();
    let report = unrealized_gains(conn, owner, &prices, today)?;

    if !maybe_print_json(json_flag, jsonl_flag, &report)? {
        let rows = report
            .lines
            .iter()
            .map(|line| {
                vec![
                    line.symbol.clone(),
                    line.purchase_date.to_string(),
                    format!("{}", line.quantity),
                    fmt_money(&line.cost_basis),
                    line.current_value
                        .as_ref()
                        .map(fmt_money)
                        .unwrap_or_else(|| "n/a".into()),
                    line.unrealized_gain
                        .as_ref()
                        .map(fmt_money)
                        .unwrap_or_else(|| "n/a".into()),
                    if line.long_term_if_sold { "long" } else { "short" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Symbol", "Purchased", "Qty", "Cost Basis", "Value", "Unrealized", "Term"],
                rows,
            )
        );
        println!(
            "Totals: cost basis {}, value {}, unrealized {}",
            fmt_money(&report.total_cost_basis),
            fmt_money(&report.total_value),
            fmt_money(&report.total_unrealized),
        );
        if !report.unpriced_symbols.is_empty() {
            println!("No price for: {}", report.unpriced_symbols.join(", "));
        }
    }
    Ok(())
}

fn tax(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = sub.get_one::<String>("owner").unwrap();
    let year: i32 = sub
        .get_one::<String>("year")
        .unwrap()
        .trim()
        .parse()
        .with_context(|| format!("Invalid year '{}'", sub.get_one::<String>("year").unwrap()))?;
    let json_flag = sub.get_flag("json");

    let summary = tax_summary(conn, owner, year)?;
    if !maybe_print_json(json_flag, false, &summary)? {
        let rows = vec![
            vec![
                "short-term".to_string(),
                fmt_money(&summary.short_term_gains),
                fmt_money(&summary.short_term_losses),
                fmt_money(&summary.net_short_term),
            ],
            vec![
                "long-term".to_string(),
                fmt_money(&summary.long_term_gains),
                fmt_money(&summary.long_term_losses),
                fmt_money(&summary.net_long_term),
            ],
        ];
        println!("Tax year {}", summary.year);
        println!("{}", pretty_table(&["Term", "Gains", "Losses", "Net"], rows));
        println!("Total net gain: {}", fmt_money(&summary.total_net));

        if !summary.per_asset.is_empty() {
            let rows = summary
                .per_asset
                .iter()
                .map(|line| {
                    vec![
                        line.symbol.clone(),
                        fmt_money(&line.short_term),
                        fmt_money(&line.long_term),
                        fmt_money(&line.total),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Symbol", "Short-Term", "Long-Term", "Total"], rows)
            );
        }
    }
    Ok(())
}
