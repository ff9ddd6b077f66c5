// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub symbol: String,
    pub class: String,
    pub name: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(anyhow!("Unknown trade side '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub owner: String,
    pub asset_id: i64,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fees: Decimal,
    pub total_amount: Decimal,
    pub date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxLot {
    pub id: i64,
    pub owner: String,
    pub asset_id: i64,
    pub buy_transaction_id: i64,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub cost_basis_per_unit: Decimal,
    pub purchase_date: NaiveDate,
}

impl TaxLot {
    /// Cost basis still held in this lot.
    pub fn remaining_cost_basis(&self) -> Decimal {
        self.remaining_quantity * self.cost_basis_per_unit
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity.is_zero()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedGain {
    pub id: i64,
    pub owner: String,
    pub sell_transaction_id: i64,
    pub lot_id: i64,
    pub asset_id: i64,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub proceeds: Decimal,
    pub gain_loss: Decimal,
    pub holding_days: i64,
    pub long_term: bool,
    pub sale_date: NaiveDate,
}
