use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::ValidationError;

/// Identifier stamped on every quote record by the provider that produced it.
///
/// `Yahoo` and `Stooq` name the bundled adapters. Any other adapter names
/// itself with `Other`, which serializes as the given name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Yahoo,
    Stooq,
    Other(&'static str),
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Stooq => "stooq",
            Self::Other(name) => name,
        }
    }

    /// Parse a comma-separated priority list such as `yahoo,stooq`.
    ///
    /// Only bundled providers can be named, each at most once.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ValidationError> {
        let mut providers = Vec::new();
        for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let provider = Self::from_str(item)?;
            if providers.contains(&provider) {
                return Err(ValidationError::DuplicateSource {
                    value: provider.as_str().to_owned(),
                });
            }
            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(ValidationError::EmptySourceList);
        }
        Ok(providers)
    }
}

impl Serialize for ProviderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "stooq" => Ok(Self::Stooq),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
