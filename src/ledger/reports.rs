// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::error::LedgerError;
use crate::ledger::lots;
use crate::ledger::settlement::{gain_from_row, read_gain, LONG_TERM_MIN_DAYS};
use crate::models::RealizedGain;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Serialize)]
pub struct CostBasisLine {
    pub class: String,
    pub lots: usize,
    pub cost_basis: Decimal,
}

/// Live lots grouped by asset class, summing remaining cost basis.
pub fn cost_basis_report(conn: &Connection, owner: &str) -> Result<Vec<CostBasisLine>, LedgerError> {
    let mut by_class: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
    for (asset, lot) in lots::lots_with_assets(conn, owner, false)? {
        let entry = by_class.entry(asset.class).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += lot.remaining_cost_basis();
    }
    Ok(by_class
        .into_iter()
        .map(|(class, (lots, cost_basis))| CostBasisLine {
            class,
            lots,
            cost_basis,
        })
        .collect())
}

#[derive(Debug, Serialize)]
pub struct UnrealizedLine {
    pub symbol: String,
    pub lot_id: i64,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub current_price: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub unrealized_gain: Option<Decimal>,
    pub long_term_if_sold: bool,
}

#[derive(Debug, Serialize)]
pub struct UnrealizedReport {
    pub lines: Vec<UnrealizedLine>,
    pub total_cost_basis: Decimal,
    /// Sums cover priced lots only; symbols without a quote are listed in
    /// `unpriced_symbols` rather than failing the report.
    pub total_value: Decimal,
    pub total_unrealized: Decimal,
    pub unpriced_symbols: Vec<String>,
}

/// Per-lot unrealized figures against externally supplied prices.
pub fn unrealized_gains(
    conn: &Connection,
    owner: &str,
    prices: &HashMap<String, Decimal>,
    as_of: NaiveDate,
) -> Result<UnrealizedReport, LedgerError> {
    let mut lines = Vec::new();
    let mut total_cost_basis = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    let mut total_unrealized = Decimal::ZERO;
    let mut unpriced: Vec<String> = Vec::new();

    for (asset, lot) in lots::lots_with_assets(conn, owner, false)? {
        let cost_basis = lot.remaining_cost_basis();
        total_cost_basis += cost_basis;

        let current_price = prices.get(&asset.symbol).copied();
        let current_value = current_price.map(|p| lot.remaining_quantity * p);
        let unrealized_gain = current_value.map(|v| v - cost_basis);
        if let Some(v) = current_value {
            total_value += v;
            total_unrealized += v - cost_basis;
        } else if !unpriced.contains(&asset.symbol) {
            unpriced.push(asset.symbol.clone());
        }

        let held = (as_of - lot.purchase_date).num_days();
        lines.push(UnrealizedLine {
            symbol: asset.symbol,
            lot_id: lot.id,
            purchase_date: lot.purchase_date,
            quantity: lot.remaining_quantity,
            cost_basis,
            current_price,
            current_value,
            unrealized_gain,
            long_term_if_sold: held >= LONG_TERM_MIN_DAYS,
        });
    }

    Ok(UnrealizedReport {
        lines,
        total_cost_basis,
        total_value,
        total_unrealized,
        unpriced_symbols: unpriced,
    })
}

#[derive(Debug, Serialize)]
pub struct AssetTaxLine {
    pub symbol: String,
    pub short_term: Decimal,
    pub long_term: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TaxSummary {
    pub year: i32,
    pub short_term_gains: Decimal,
    pub short_term_losses: Decimal,
    pub long_term_gains: Decimal,
    pub long_term_losses: Decimal,
    pub net_short_term: Decimal,
    pub net_long_term: Decimal,
    pub total_net: Decimal,
    pub per_asset: Vec<AssetTaxLine>,
}

/// Realized gains for the calendar year, split short/long-term. Losses are
/// stored as negative gains and reported as positive figures; short and long
/// net independently before the combined total.
pub fn tax_summary(conn: &Connection, owner: &str, year: i32) -> Result<TaxSummary, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT g.id, g.owner, g.sell_transaction_id, g.lot_id, g.asset_id, g.quantity,
                g.cost_basis, g.proceeds, g.gain_loss, g.holding_days, g.long_term,
                g.sale_date, a.symbol
         FROM realized_gains g JOIN assets a ON g.asset_id=a.id
         WHERE g.owner=?1 AND substr(g.sale_date,1,4)=?2
         ORDER BY g.sale_date, g.id",
    )?;
    let rows = stmt.query_map(params![owner, format!("{:04}", year)], |r| {
        let raw = read_gain(r)?;
        let symbol: String = r.get(12)?;
        Ok((raw, symbol))
    })?;

    let mut summary = TaxSummary {
        year,
        short_term_gains: Decimal::ZERO,
        short_term_losses: Decimal::ZERO,
        long_term_gains: Decimal::ZERO,
        long_term_losses: Decimal::ZERO,
        net_short_term: Decimal::ZERO,
        net_long_term: Decimal::ZERO,
        total_net: Decimal::ZERO,
        per_asset: Vec::new(),
    };
    let mut by_asset: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();

    for row in rows {
        let (raw, symbol) = row?;
        let gain: RealizedGain = gain_from_row(raw)?;
        match (gain.long_term, gain.gain_loss >= Decimal::ZERO) {
            (false, true) => summary.short_term_gains += gain.gain_loss,
            (false, false) => summary.short_term_losses += -gain.gain_loss,
            (true, true) => summary.long_term_gains += gain.gain_loss,
            (true, false) => summary.long_term_losses += -gain.gain_loss,
        }
        let entry = by_asset
            .entry(symbol)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        if gain.long_term {
            entry.1 += gain.gain_loss;
        } else {
            entry.0 += gain.gain_loss;
        }
    }

    summary.net_short_term = summary.short_term_gains - summary.short_term_losses;
    summary.net_long_term = summary.long_term_gains - summary.long_term_losses;
    summary.total_net = summary.net_short_term + summary.net_long_term;
    summary.per_asset = by_asset
        .into_iter()
        .map(|(symbol, (short_term, long_term))| AssetTaxLine {
            symbol,
            short_term,
            long_term,
            total: short_term + long_term,
        })
        .collect();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ledger::transactions::{record_transaction, TradeRequest};
    use crate::models::TradeSide;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn trade(
        symbol: &str,
        class: &str,
        side: TradeSide,
        qty: &str,
        price: &str,
        on: &str,
    ) -> TradeRequest {
        TradeRequest {
            owner: "me".into(),
            symbol: symbol.into(),
            class: class.into(),
            side,
            quantity: d(qty),
            price: d(price),
            fees: Decimal::ZERO,
            date: date(on),
            note: None,
        }
    }

    #[test]
    fn cost_basis_groups_live_lots_by_class() {
        let mut conn = db::open_in_memory().unwrap();
        record_transaction(&mut conn, &trade("VTI", "etf", TradeSide::Buy, "10", "200", "2023-01-01")).unwrap();
        record_transaction(&mut conn, &trade("VXUS", "etf", TradeSide::Buy, "20", "50", "2023-02-01")).unwrap();
        record_transaction(&mut conn, &trade("BTC-USD", "crypto", TradeSide::Buy, "1", "30000", "2023-03-01")).unwrap();
        // Drain the VXUS lot fully; it must drop out of the report
        record_transaction(&mut conn, &trade("VXUS", "etf", TradeSide::Sell, "20", "60", "2023-08-01")).unwrap();

        let report = cost_basis_report(&conn, "me").unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].class, "crypto");
        assert_eq!(report[0].cost_basis, d("30000"));
        assert_eq!(report[1].class, "etf");
        assert_eq!(report[1].lots, 1);
        assert_eq!(report[1].cost_basis, d("2000"));
    }

    #[test]
    fn unrealized_tolerates_missing_prices() {
        let mut conn = db::open_in_memory().unwrap();
        record_transaction(&mut conn, &trade("VTI", "etf", TradeSide::Buy, "10", "200", "2023-01-01")).unwrap();
        record_transaction(&mut conn, &trade("VXUS", "etf", TradeSide::Buy, "20", "50", "2024-06-01")).unwrap();

        let mut prices = HashMap::new();
        prices.insert("VTI".to_string(), d("250"));

        let report = unrealized_gains(&conn, "me", &prices, date("2024-07-01")).unwrap();
        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.total_cost_basis, d("3000"));
        assert_eq!(report.total_value, d("2500"));
        assert_eq!(report.total_unrealized, d("500"));
        assert_eq!(report.unpriced_symbols, vec!["VXUS".to_string()]);

        let vti = &report.lines[0];
        assert_eq!(vti.symbol, "VTI");
        assert_eq!(vti.unrealized_gain, Some(d("500")));
        assert!(vti.long_term_if_sold);

        let vxus = &report.lines[1];
        assert_eq!(vxus.current_value, None);
        assert!(!vxus.long_term_if_sold);
    }

    #[test]
    fn tax_summary_partitions_and_nets() {
        let mut conn = db::open_in_memory().unwrap();
        // Long-term gain: +495 on lot held 396 days
        record_transaction(&mut conn, &trade("ABC", "stock", TradeSide::Buy, "10", "100", "2023-01-01")).unwrap();
        // Short-term loss: bought high, sold low within the year
        record_transaction(&mut conn, &trade("XYZ", "stock", TradeSide::Buy, "5", "80", "2023-11-01")).unwrap();

        record_transaction(&mut conn, &trade("ABC", "stock", TradeSide::Sell, "10", "149.5", "2024-02-01")).unwrap();
        record_transaction(&mut conn, &trade("XYZ", "stock", TradeSide::Sell, "5", "60", "2024-03-01")).unwrap();
        // A sale outside the year must not leak in
        record_transaction(&mut conn, &trade("ABC", "stock", TradeSide::Buy, "1", "100", "2025-01-02")).unwrap();
        record_transaction(&mut conn, &trade("ABC", "stock", TradeSide::Sell, "1", "90", "2025-03-01")).unwrap();

        let summary = tax_summary(&conn, "me", 2024).unwrap();
        assert_eq!(summary.long_term_gains, d("495.0"));
        assert_eq!(summary.long_term_losses, Decimal::ZERO);
        assert_eq!(summary.short_term_gains, Decimal::ZERO);
        assert_eq!(summary.short_term_losses, d("100"));
        assert_eq!(summary.net_short_term, d("-100"));
        assert_eq!(summary.net_long_term, d("495.0"));
        assert_eq!(summary.total_net, d("395.0"));

        assert_eq!(summary.per_asset.len(), 2);
        assert_eq!(summary.per_asset[0].symbol, "ABC");
        assert_eq!(summary.per_asset[0].total, d("495.0"));
        assert_eq!(summary.per_asset[1].symbol, "XYZ");
        assert_eq!(summary.per_asset[1].total, d("-100"));
    }
}
