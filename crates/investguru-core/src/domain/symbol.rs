use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Market suffix some providers expect on US listings.
pub const US_MARKET_SUFFIX: &str = ".US";

/// Known misspellings and aliases, matched exactly after uppercasing.
const COMMON_FIXUPS: &[(&str, &str)] = &[("APPL", "AAPL"), ("GOOGLE", "GOOGL")];

/// Ordered spelling variants of one ticker, tried in sequence against a provider.
///
/// Always holds between one and three entries. The first entry is the bare
/// (trimmed, uppercased, fixed-up) symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for CandidateList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Expand a raw user-supplied ticker into provider candidates.
///
/// Whitespace-only input is not rejected here; it yields a single empty
/// candidate and the adapters report it as no-data.
pub fn normalize(raw: &str) -> CandidateList {
    let upper = raw.trim().to_ascii_uppercase();
    let symbol = COMMON_FIXUPS
        .iter()
        .find(|(typo, _)| *typo == upper)
        .map(|(_, fixed)| (*fixed).to_owned())
        .unwrap_or(upper);

    if symbol.is_empty() || has_market_suffix(&symbol) {
        return CandidateList(vec![symbol]);
    }

    let suffixed = format!("{symbol}{US_MARKET_SUFFIX}");
    let lower_suffixed = format!("{symbol}{}", US_MARKET_SUFFIX.to_ascii_lowercase());
    CandidateList(vec![symbol, suffixed, lower_suffixed])
}

/// Canonical ticker for a quote record: uppercase, no market suffix.
pub fn canonical_symbol(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    match upper.strip_suffix(US_MARKET_SUFFIX) {
        Some(bare) if !bare.is_empty() => bare.to_owned(),
        _ => upper,
    }
}

fn has_market_suffix(symbol: &str) -> bool {
    symbol
        .len()
        .checked_sub(US_MARKET_SUFFIX.len())
        .and_then(|start| symbol.get(start..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(US_MARKET_SUFFIX))
}
