// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use lotbook::db;
use lotbook::ledger::lots::{lot_for_buy, lots_with_assets};
use lotbook::ledger::transactions::{delete_transaction, record_transaction, TradeRequest};
use lotbook::ledger::LedgerError;
use lotbook::models::TradeSide;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn trade(side: TradeSide, qty: &str, price: &str, fees: &str, on: &str) -> TradeRequest {
    TradeRequest {
        owner: "default".into(),
        symbol: "ABC".into(),
        class: "stock".into(),
        side,
        quantity: d(qty),
        price: d(price),
        fees: d(fees),
        date: date(on),
        note: None,
    }
}

// The full buy/sell/reverse walk: two lots, a FIFO sale across both, an
// oversell refusal, a sell reversal, then buy deletion.
#[test]
fn lifecycle_of_two_lots_and_a_fifo_sale() {
    let mut conn = db::open_in_memory().unwrap();

    // Buy 10 @ 100 with 5 fees: basis 100.50/unit
    let b1 = record_transaction(&mut conn, &trade(TradeSide::Buy, "10", "100", "5", "2023-01-01"))
        .unwrap();
    let lot1 = b1.lot.as_ref().unwrap();
    assert_eq!(lot1.cost_basis_per_unit, d("100.5"));
    assert_eq!(lot1.remaining_quantity, d("10"));

    // Buy 5 @ 120, clean
    let b2 = record_transaction(&mut conn, &trade(TradeSide::Buy, "5", "120", "0", "2023-06-01"))
        .unwrap();
    assert_eq!(b2.lot.as_ref().unwrap().cost_basis_per_unit, d("120"));

    // Sell 12 @ 150: 10 long-term from lot 1, 2 short-term from lot 2
    let s = record_transaction(&mut conn, &trade(TradeSide::Sell, "12", "150", "0", "2024-02-01"))
        .unwrap();
    assert_eq!(s.realized_gains.len(), 2);
    let (g1, g2) = (&s.realized_gains[0], &s.realized_gains[1]);
    assert_eq!(g1.quantity, d("10"));
    assert_eq!(g1.gain_loss, d("495.0"));
    assert_eq!(g1.holding_days, 396);
    assert!(g1.long_term);
    assert_eq!(g2.quantity, d("2"));
    assert_eq!(g2.gain_loss, d("60"));
    assert_eq!(g2.holding_days, 245);
    assert!(!g2.long_term);

    let lots = lots_with_assets(&conn, "default", true).unwrap();
    assert_eq!(lots[0].1.remaining_quantity, Decimal::ZERO);
    assert_eq!(lots[1].1.remaining_quantity, d("3"));

    // Only 3 remain; selling 4 must fail and change nothing
    let err = record_transaction(&mut conn, &trade(TradeSide::Sell, "4", "150", "0", "2024-03-01"))
        .unwrap_err();
    match err {
        LedgerError::InsufficientHoldings {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, d("4"));
            assert_eq!(available, d("3"));
        }
        other => panic!("expected InsufficientHoldings, got {other}"),
    }
    let lots = lots_with_assets(&conn, "default", true).unwrap();
    assert_eq!(lots[1].1.remaining_quantity, d("3"));

    // Deleting the buy is refused while its lot backs the sale
    let err = delete_transaction(&mut conn, "default", b1.transaction.id).unwrap_err();
    assert!(matches!(err, LedgerError::HasDependentSales { .. }));

    // Reversing the sale restores both lots and drops the gain rows
    delete_transaction(&mut conn, "default", s.transaction.id).unwrap();
    let lot1 = lot_for_buy(&conn, b1.transaction.id).unwrap().unwrap();
    let lot2 = lot_for_buy(&conn, b2.transaction.id).unwrap().unwrap();
    assert_eq!(lot1.remaining_quantity, d("10"));
    assert_eq!(lot2.remaining_quantity, d("5"));
    let gains: i64 = conn
        .query_row("SELECT COUNT(*) FROM realized_gains", [], |r| r.get(0))
        .unwrap();
    assert_eq!(gains, 0);

    // Now the buy deletion goes through and takes its lot with it
    delete_transaction(&mut conn, "default", b1.transaction.id).unwrap();
    assert!(lot_for_buy(&conn, b1.transaction.id).unwrap().is_none());
    let lots = lots_with_assets(&conn, "default", true).unwrap();
    assert_eq!(lots.len(), 1);
}

#[test]
fn fifo_order_is_by_purchase_date_not_insertion() {
    let mut conn = db::open_in_memory().unwrap();

    // Recorded newest purchase first; FIFO must still drain by purchase date
    record_transaction(&mut conn, &trade(TradeSide::Buy, "5", "30", "0", "2023-03-01")).unwrap();
    record_transaction(&mut conn, &trade(TradeSide::Buy, "5", "10", "0", "2023-01-01")).unwrap();
    record_transaction(&mut conn, &trade(TradeSide::Buy, "5", "20", "0", "2023-02-01")).unwrap();

    let s = record_transaction(&mut conn, &trade(TradeSide::Sell, "12", "40", "0", "2023-12-01"))
        .unwrap();
    let bases: Vec<Decimal> = s
        .realized_gains
        .iter()
        .map(|g| g.cost_basis / g.quantity)
        .collect();
    assert_eq!(bases, vec![d("10"), d("20"), d("30")]);
    assert_eq!(s.realized_gains[2].quantity, d("2"));
}

#[test]
fn selling_everything_leaves_empty_lots_and_conserves_quantity() {
    let mut conn = db::open_in_memory().unwrap();
    record_transaction(&mut conn, &trade(TradeSide::Buy, "2.5", "100", "0", "2023-01-01")).unwrap();
    record_transaction(&mut conn, &trade(TradeSide::Buy, "2.5", "110", "0", "2023-02-01")).unwrap();

    let s = record_transaction(&mut conn, &trade(TradeSide::Sell, "5", "120", "0", "2023-06-01"))
        .unwrap();
    let sold: Decimal = s.realized_gains.iter().map(|g| g.quantity).sum();
    assert_eq!(sold, d("5"));

    for (_, lot) in lots_with_assets(&conn, "default", true).unwrap() {
        assert_eq!(lot.remaining_quantity, Decimal::ZERO);
    }
    assert!(lots_with_assets(&conn, "default", false).unwrap().is_empty());
}

#[test]
fn owners_do_not_see_each_other() {
    let mut conn = db::open_in_memory().unwrap();
    let mut alice = trade(TradeSide::Buy, "10", "100", "0", "2023-01-01");
    alice.owner = "alice".into();
    record_transaction(&mut conn, &alice).unwrap();

    let mut bob = trade(TradeSide::Sell, "1", "110", "0", "2023-06-01");
    bob.owner = "bob".into();
    let err = record_transaction(&mut conn, &bob).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientHoldings { available, .. } if available.is_zero()
    ));

    assert_eq!(lots_with_assets(&conn, "alice", true).unwrap().len(), 1);
    assert!(lots_with_assets(&conn, "bob", true).unwrap().is_empty());
}
