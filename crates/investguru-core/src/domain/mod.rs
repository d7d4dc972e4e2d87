//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`QuoteRecord`] | Normalized quote returned by every adapter |
//! | [`CandidateList`] | Ordered spelling variants produced by [`normalize`] |
//!
//! Quote records are built only by provider adapters and are immutable once
//! handed to the resolver. Candidate lists are derived once per resolution
//! and consumed read-only.

mod quote;
mod symbol;

pub use quote::QuoteRecord;
pub use symbol::{canonical_symbol, normalize, CandidateList, US_MARKET_SUFFIX};
