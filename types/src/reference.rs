//! Session references.
//!
//! A reference identifies one verification attempt towards the vendor. It is
//! either supplied by the caller (a journey token), or generated locally as
//! `REF-<unix millis>-<5 hex chars>`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{KycError, Timestamp};

/// Length of the random suffix appended to generated references.
const SUFFIX_LEN: usize = 5;

/// Opaque verification reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionReference(String);

impl SessionReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Generate a fresh reference for `now`.
    pub fn generate(now: Timestamp) -> Result<Self, KycError> {
        let mut bytes = [0u8; 3];
        getrandom::getrandom(&mut bytes).map_err(|e| KycError::Randomness(e.to_string()))?;
        let suffix = hex::encode(bytes);
        Ok(Self(format!(
            "REF-{}-{}",
            now.as_millis(),
            &suffix[..SUFFIX_LEN]
        )))
    }

    /// Extract the journey token (last non-empty path segment) from a
    /// vendor journey URL.
    pub fn from_journey_url(url: &str) -> Result<Self, KycError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/')
            .find(|segment| !segment.is_empty())
            .filter(|segment| !segment.contains(':'))
            .map(|segment| Self(segment.to_string()))
            .ok_or_else(|| KycError::InvalidJourneyUrl(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
