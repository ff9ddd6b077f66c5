// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The accounting core: buys open cost-basis tax lots, sells consume them
//! oldest-first (FIFO) and realize gains lot by lot, deletions reverse those
//! effects exactly, and the reports roll lots and gains up into cost-basis,
//! unrealized and annual tax summaries.
//!
//! Every multi-table write runs inside a single `rusqlite` transaction; a
//! transaction row is never left without its lot or gain effects.

pub mod assets;
pub mod error;
pub mod lots;
pub mod reports;
pub mod settlement;
pub mod transactions;

pub use error::LedgerError;
pub use settlement::LONG_TERM_MIN_DAYS;
pub use transactions::{RecordedTransaction, TradeRequest};
