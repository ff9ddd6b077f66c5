// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{crate_version, value_parser, Arg, ArgAction, Command};

fn owner_arg() -> Arg {
    Arg::new("owner")
        .long("owner")
        .default_value("default")
        .help("Ledger owner the operation is scoped to")
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print as pretty JSON")
}

fn jsonl_flag() -> Arg {
    Arg::new("jsonl")
        .long("jsonl")
        .action(ArgAction::SetTrue)
        .help("Print as JSON lines")
}

fn trade_cmd(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .arg(owner_arg())
        .arg(Arg::new("date").long("date").required(true).help("Trade date YYYY-MM-DD"))
        .arg(Arg::new("symbol").long("symbol").required(true).help("Ticker symbol"))
        .arg(
            Arg::new("class")
                .long("class")
                .default_value("stock")
                .help("Asset class (stock, etf, crypto, ...)"),
        )
        .arg(Arg::new("quantity").long("quantity").required(true))
        .arg(Arg::new("price").long("price").required(true).help("Price per unit"))
        .arg(Arg::new("fees").long("fees").help("Commission/fees, default 0"))
        .arg(Arg::new("note").long("note"))
}

pub fn build_cli() -> Command {
    Command::new("lotbook")
        .about("Personal investment ledger with FIFO tax-lot accounting")
        .version(crate_version!())
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("asset")
                .about("Manage tradable assets")
                .subcommand(
                    Command::new("add")
                        .about("Register an asset")
                        .arg(Arg::new("symbol").long("symbol").required(true))
                        .arg(Arg::new("class").long("class").default_value("stock"))
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("currency").long("currency").default_value("USD")),
                )
                .subcommand(Command::new("list").about("List known assets")),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and manage buy/sell transactions")
                .subcommand(trade_cmd("buy", "Record a purchase; opens a tax lot"))
                .subcommand(trade_cmd(
                    "sell",
                    "Record a sale; settles FIFO against open lots",
                ))
                .subcommand(
                    Command::new("list")
                        .about("List transactions")
                        .arg(owner_arg())
                        .arg(Arg::new("symbol").long("symbol"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(json_flag())
                        .arg(jsonl_flag()),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete a transaction, reversing its ledger effects")
                        .arg(owner_arg())
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        ),
                ),
        )
        .subcommand(
            Command::new("lots")
                .about("List tax lots")
                .arg(owner_arg())
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Include fully consumed lots"),
                )
                .arg(json_flag())
                .arg(jsonl_flag()),
        )
        .subcommand(
            Command::new("report")
                .about("Cost-basis, unrealized-gain and tax reports")
                .subcommand(
                    Command::new("cost-basis")
                        .about("Remaining cost basis by asset class")
                        .arg(owner_arg())
                        .arg(json_flag())
                        .arg(jsonl_flag()),
                )
                .subcommand(
                    Command::new("unrealized")
                        .about("Per-lot unrealized gains at latest stored prices")
                        .arg(owner_arg())
                        .arg(
                            Arg::new("live")
                                .long("live")
                                .action(ArgAction::SetTrue)
                                .help("Fetch fresh quotes first"),
                        )
                        .arg(json_flag())
                        .arg(jsonl_flag()),
                )
                .subcommand(
                    Command::new("tax")
                        .about("Short/long-term realized gains for a year")
                        .arg(owner_arg())
                        .arg(Arg::new("year").long("year").required(true))
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("price")
                .about("Quote cache used by the unrealized report")
                .subcommand(Command::new("fetch").about("Fetch quotes for all assets"))
                .subcommand(
                    Command::new("set")
                        .about("Record a price by hand")
                        .arg(Arg::new("symbol").long("symbol").required(true))
                        .arg(Arg::new("price").long("price").required(true))
                        .arg(Arg::new("date").long("date").help("As-of date, default now")),
                )
                .subcommand(Command::new("list").about("List recent stored prices")),
        )
        .subcommand(
            Command::new("import").about("Import data").subcommand(
                Command::new("trades")
                    .about("Import trades from CSV (date,symbol,class,side,quantity,price,fees,note)")
                    .arg(Arg::new("path").long("path").required(true))
                    .arg(owner_arg()),
            ),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("transactions")
                        .about("Export the transaction ledger")
                        .arg(owner_arg())
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("gains")
                        .about("Export realized gains, e.g. for a tax filing")
                        .arg(owner_arg())
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true))
                        .arg(Arg::new("year").long("year")),
                ),
        )
        .subcommand(Command::new("doctor").about("Audit ledger invariants"))
}
