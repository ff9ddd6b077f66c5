// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use lotbook::ledger::transactions::{record_transaction, TradeRequest};
use lotbook::models::TradeSide;
use lotbook::{cli, commands::exporter, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn seed() -> Connection {
    let mut conn = db::open_in_memory().unwrap();
    let buy = TradeRequest {
        owner: "default".into(),
        symbol: "ABC".into(),
        class: "stock".into(),
        side: TradeSide::Buy,
        quantity: Decimal::from_str("10").unwrap(),
        price: Decimal::from_str("100").unwrap(),
        fees: Decimal::from_str("5").unwrap(),
        date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        note: Some("seed".into()),
    };
    record_transaction(&mut conn, &buy).unwrap();
    let sell = TradeRequest {
        side: TradeSide::Sell,
        quantity: Decimal::from_str("4").unwrap(),
        price: Decimal::from_str("150").unwrap(),
        fees: Decimal::ZERO,
        date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        note: None,
        ..buy
    };
    record_transaction(&mut conn, &sell).unwrap();
    conn
}

fn run_export(conn: &Connection, args: &[&str]) {
    let cli = cli::build_cli();
    let mut full = vec!["lotbook", "export"];
    full.extend_from_slice(args);
    let matches = cli.get_matches_from(full);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(conn, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn gains_csv_roundtrips_per_lot_rows() {
    let conn = seed();
    let out = tempfile::NamedTempFile::new().unwrap();
    let out_path = out.path().to_str().unwrap().to_string();

    run_export(
        &conn,
        &["gains", "--format", "csv", "--out", &out_path, "--year", "2024"],
    );

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "sale_date");
    assert_eq!(&headers[7], "term");
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][1], "ABC");
    assert_eq!(&rows[0][2], "4");
    // 4 * 150 - 4 * 100.50 = 198
    assert_eq!(&rows[0][5], "198.0");
    assert_eq!(&rows[0][7], "long");
}

#[test]
fn gains_export_filters_by_year() {
    let conn = seed();
    let out = tempfile::NamedTempFile::new().unwrap();
    let out_path = out.path().to_str().unwrap().to_string();

    run_export(
        &conn,
        &["gains", "--format", "csv", "--out", &out_path, "--year", "2023"],
    );

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    assert_eq!(rdr.records().count(), 0);
}

#[test]
fn transactions_json_is_parseable() {
    let conn = seed();
    let out = tempfile::NamedTempFile::new().unwrap();
    let out_path = out.path().to_str().unwrap().to_string();

    run_export(&conn, &["transactions", "--format", "json", "--out", &out_path]);

    let raw = std::fs::read_to_string(&out_path).unwrap();
    let items: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let arr = items.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["side"], "buy");
    assert_eq!(arr[0]["total"], "1005");
    assert_eq!(arr[1]["side"], "sell");
    assert_eq!(arr[1]["total"], "600");
}
