//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// A country record as shipped in `countries.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code, uppercase (e.g. "GB").
    pub iso: String,
    pub name: String,
}

impl Country {
    pub fn new(iso: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iso: iso.into(),
            name: name.into(),
        }
    }
}

/// ISO code → city names, in the order the loader produced them.
pub type CityIndex = HashMap<String, Vec<String>>;

/// Outcome of a validation query that did not hit a hard failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// The input was well-formed but does not name a known country or city.
    Invalid(LocationError),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Location lookup errors.
///
/// Every variant renders a distinct message prefix so that HTTP clients can
/// classify failures from the `error` string alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("No country specified")]
    NoCountrySpecified,

    #[error("No city specified")]
    NoCitySpecified,

    #[error("Unable to find data for country: {0}")]
    CountryNotFound(String),

    #[error("Unknown ISO2 code: {0}")]
    UnknownIsoCode(String),

    /// More than one country shares the requested name. This points at bad
    /// reference data, not at a bad request.
    #[error(
        "Ambiguous result, multiple country matches returned for {identifier} ({count} matches). \
         Try request with ISO code instead"
    )]
    AmbiguousCountry { identifier: String, count: usize },

    #[error("Unknown city data for ISO2 code: {0}")]
    UnknownCity(String),

    #[error("Unable to find city: {city} ({iso})")]
    CityNotFound { iso: String, city: String },

    #[error("Failed to load location data: {0}")]
    LoaderFailure(#[from] LoadError),
}

/// Startup-time failures while reading the reference artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("missing artifact: {}", .0.display())]
    Missing(PathBuf),

    #[error("cannot read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("malformed JSON in {}: {message}", .path.display())]
    Json { path: PathBuf, message: String },

    #[error("invalid ISO2 code '{code}' in {}", .path.display())]
    InvalidIsoCode { path: PathBuf, code: String },

    #[error("duplicate country ISO2 code '{0}'")]
    DuplicateCountry(String),

    #[error("duplicate city data for ISO2 code '{0}'")]
    DuplicateCityBucket(String),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::Missing(path);
        }
        Self::Io {
            path,
            message: err.to_string(),
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, err: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Two ASCII uppercase letters.
pub fn is_canonical_iso(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}
