// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use lotbook::{cli, commands::transactions, db};
use rusqlite::Connection;

fn setup() -> Connection {
    let mut conn = db::open_in_memory().unwrap();
    for (date, qty, price) in [
        ("2025-01-01", "10", "100"),
        ("2025-01-02", "5", "105"),
        ("2025-01-03", "2", "110"),
    ] {
        let cli = cli::build_cli();
        let matches = cli.get_matches_from([
            "lotbook", "tx", "buy", "--date", date, "--symbol", "ABC", "--quantity", qty,
            "--price", price,
        ]);
        if let Some(("tx", tx_m)) = matches.subcommand() {
            transactions::handle(&mut conn, tx_m).unwrap();
        } else {
            panic!("no tx subcommand");
        }
    }
    conn
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["lotbook", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, "2025-01-03");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn buy_through_cli_opens_a_lot() {
    let conn = setup();
    let lots: i64 = conn
        .query_row("SELECT COUNT(*) FROM tax_lots", [], |r| r.get(0))
        .unwrap();
    assert_eq!(lots, 3);
    let (remaining, basis): (String, String) = conn
        .query_row(
            "SELECT remaining_quantity, cost_basis_per_unit FROM tax_lots WHERE id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(remaining, "10");
    assert_eq!(basis, "100");
}

#[test]
fn sell_through_cli_trims_inputs_and_settles() {
    let mut conn = setup();
    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "lotbook", "tx", "sell", "--date", " 2025-06-01 ", "--symbol", " abc ", "--quantity",
        " 12 ", "--price", " 120 ",
    ]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        transactions::handle(&mut conn, tx_m).unwrap();
    } else {
        panic!("no tx subcommand");
    }

    // 10 from the first lot, 2 from the second
    let gains: i64 = conn
        .query_row("SELECT COUNT(*) FROM realized_gains", [], |r| r.get(0))
        .unwrap();
    assert_eq!(gains, 2);
    let remaining: String = conn
        .query_row(
            "SELECT remaining_quantity FROM tax_lots WHERE id=2",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(remaining, "3");
}

#[test]
fn rm_through_cli_names_dependent_sales() {
    let mut conn = setup();
    let cli = cli::build_cli();
    let matches =
        cli.get_matches_from(["lotbook", "tx", "sell", "--date", "2025-06-01", "--symbol", "ABC",
            "--quantity", "1", "--price", "120"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        transactions::handle(&mut conn, tx_m).unwrap();
    }

    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["lotbook", "tx", "rm", "--id", "1"]);
    let err = match matches.subcommand() {
        Some(("tx", tx_m)) => transactions::handle(&mut conn, tx_m).unwrap_err(),
        _ => panic!("no tx subcommand"),
    };
    assert!(err.to_string().contains("dependent sell transactions [4]"));
}
