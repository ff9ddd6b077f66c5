// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

/// Accounting failures surfaced to callers with enough detail to act on.
/// Anything hitting one of these inside a transaction scope rolls the whole
/// unit back.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient holdings of {symbol}: requested {requested}, available {available}")]
    InsufficientHoldings {
        symbol: String,
        requested: Decimal,
        available: Decimal,
    },

    /// Deleting a buy whose lot has been drawn on. The dependent sell
    /// transactions must be deleted first; no cascade.
    #[error("buy transaction {transaction_id} has dependent sell transactions {dependent_sells:?}")]
    HasDependentSales {
        transaction_id: i64,
        dependent_sells: Vec<i64>,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl LedgerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidInput(msg.into())
    }
}
