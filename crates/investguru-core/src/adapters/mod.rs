//! Provider adapters.
//!
//! | Adapter | Upstream | Payload |
//! |---------|----------|---------|
//! | [`StooqAdapter`] | stooq.com light quote endpoint | two-line CSV |
//! | [`YahooAdapter`] | Yahoo Finance chart + search | JSON |

pub mod stooq;
pub mod yahoo;

pub use stooq::StooqAdapter;
pub use yahoo::YahooAdapter;
