//! Error types and utilities for butterfly-osm toolkit
//!
//! Provides the error type shared by the fetch layer and fuzzy matching for
//! user-supplied vehicle names.

use std::fmt;
use strsim::{jaro_winkler, normalized_levenshtein};

/// Vehicle names understood by the tile loader.
pub const KNOWN_VEHICLES: &[&str] = &["car", "bike", "foot"];

/// Common aliases people type instead of the canonical vehicle name.
const VEHICLE_ALIASES: &[(&str, &str)] = &[
    ("bicycle", "bike"),
    ("cycle", "bike"),
    ("motorcar", "car"),
    ("pedestrian", "foot"),
    ("walk", "foot"),
];

/// Find the best fuzzy match among `candidates`.
///
/// Scores with Jaro-Winkler (70%) and normalized Levenshtein (30%), the same
/// weighting used for source names. Jaro-Winkler favours shared prefixes, and
/// typos in short identifiers like "carr" or "fot" usually keep the prefix.
fn find_best_fuzzy_match(input: &str, candidates: &[&str]) -> Option<String> {
    let input_lower = input.to_lowercase();
    let mut best_match = None;
    let mut best_score = 0.0f64;

    // Short names leave little room for error; below this nothing is a match.
    let min_threshold = 0.6;

    for candidate in candidates {
        let jw_score = jaro_winkler(&input_lower, candidate);
        let lev_score = normalized_levenshtein(&input_lower, candidate);
        let score = (jw_score * 0.7) + (lev_score * 0.3);

        if score >= min_threshold && score > best_score {
            best_score = score;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Suggest the intended vehicle for a misspelled or aliased vehicle name.
///
/// Returns `None` for names that are already valid (case-insensitive) and for
/// input too far from any known vehicle.
pub fn suggest_vehicle(name: &str) -> Option<String> {
    if KNOWN_VEHICLES.iter().any(|v| v.eq_ignore_ascii_case(name)) {
        return None;
    }

    for (alias, vehicle) in VEHICLE_ALIASES {
        if alias.eq_ignore_ascii_case(name) {
            return Some(vehicle.to_string());
        }
    }

    find_best_fuzzy_match(name, KNOWN_VEHICLES)
}

/// Main error type for butterfly-osm fetch operations
#[derive(Debug)]
pub enum Error {
    /// HTTP-specific error (unexpected status, malformed response)
    HttpError(String),

    /// File I/O error
    IoError(std::io::Error),

    /// Invalid configuration or parameters
    InvalidInput(String),

    /// Network connectivity issues, safe to retry
    NetworkError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for butterfly-osm operations
pub type Result<T> = std::result::Result<T, Error>;
