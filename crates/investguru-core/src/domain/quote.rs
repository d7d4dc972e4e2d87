use serde::Serialize;

use crate::domain::symbol::canonical_symbol;
use crate::{ProviderId, ValidationError};

/// Normalized quote shared by every provider adapter.
///
/// Only `close` is mandatory. Prices stay as the provider rendered them;
/// `date` and `time` are provider-local and carry no timezone guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: String,
    pub volume: Option<String>,
    pub source: ProviderId,
}

impl QuoteRecord {
    pub fn new(
        symbol: &str,
        close: impl Into<String>,
        source: ProviderId,
    ) -> Result<Self, ValidationError> {
        let close = close.into();
        if close.trim().is_empty() {
            return Err(ValidationError::EmptyClose);
        }

        Ok(Self {
            symbol: canonical_symbol(symbol),
            name: None,
            date: None,
            time: None,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            source,
        })
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = non_empty(name);
        self
    }

    pub fn with_timestamp(mut self, date: Option<String>, time: Option<String>) -> Self {
        self.date = non_empty(date);
        self.time = non_empty(time);
        self
    }

    pub fn with_range(
        mut self,
        open: Option<String>,
        high: Option<String>,
        low: Option<String>,
    ) -> Self {
        self.open = non_empty(open);
        self.high = non_empty(high);
        self.low = non_empty(low);
        self
    }

    pub fn with_volume(mut self, volume: Option<String>) -> Self {
        self.volume = non_empty(volume);
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
