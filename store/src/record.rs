//! The persisted verification record.
//!
//! Four string keys in the host's preference store. The record is read once
//! when a session starts and written at most once per terminal outcome.
//!
//! Schema changes are handled by erasure: if the stored schema version does
//! not match the current one, every key is wiped and the version is
//! rewritten.

use kyc_types::{VerificationOutcome, VerificationStatus};

use crate::{PreferenceStore, StoreError};

pub const KEY_VERIFIED_EMAIL: &str = "verified_email";
pub const KEY_VERIFICATION_REFERENCE: &str = "verification_reference";
pub const KEY_VERIFICATION_STATUS: &str = "verification_status";
pub const KEY_STORAGE_VERSION: &str = "storage_version";

/// All keys owned by the record, version included.
pub const RECORD_KEYS: [&str; 4] = [
    KEY_VERIFIED_EMAIL,
    KEY_VERIFICATION_REFERENCE,
    KEY_VERIFICATION_STATUS,
    KEY_STORAGE_VERSION,
];

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Persisted form of a terminal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStatus {
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Persisted status for an outcome status. `pending` has none: the
    /// vendor has not decided yet.
    pub fn for_status(status: VerificationStatus) -> Option<Self> {
        match status {
            VerificationStatus::Verified => Some(Self::Completed),
            VerificationStatus::Declined | VerificationStatus::Error => Some(Self::Failed),
            VerificationStatus::Pending => None,
        }
    }
}

/// The record as read from the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistedVerificationRecord {
    pub verified_email: Option<String>,
    pub verification_reference: Option<String>,
    pub verification_status: Option<RecordStatus>,
    pub storage_schema_version: String,
}

impl PersistedVerificationRecord {
    pub fn is_verified(&self) -> bool {
        self.verification_status == Some(RecordStatus::Completed)
    }
}

/// Result of [`load_record`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedRecord {
    pub record: PersistedVerificationRecord,
    /// The stored version that was erased, if a migration happened.
    pub erased_version: Option<String>,
}

/// Load the record, erasing it first if its schema version is stale.
///
/// A store with no version key at all is treated as stale too (fresh
/// install or pre-versioning data); the erase is then a no-op apart from
/// writing the version.
pub fn load_record(
    store: &dyn PreferenceStore,
    current_version: &str,
) -> Result<LoadedRecord, StoreError> {
    let stored_version = store.get(KEY_STORAGE_VERSION)?;
    if stored_version.as_deref() != Some(current_version) {
        tracing::info!(
            stored = stored_version.as_deref().unwrap_or("<none>"),
            current = current_version,
            "preference schema version mismatch, erasing verification record"
        );
        clear_record(store, current_version)?;
        return Ok(LoadedRecord {
            record: PersistedVerificationRecord {
                storage_schema_version: current_version.to_string(),
                ..Default::default()
            },
            erased_version: stored_version,
        });
    }

    let status = store.get(KEY_VERIFICATION_STATUS)?;
    let verification_status = match status.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = RecordStatus::parse(raw);
            if parsed.is_none() {
                tracing::warn!(status = raw, "ignoring unknown persisted verification status");
            }
            parsed
        }
    };

    Ok(LoadedRecord {
        record: PersistedVerificationRecord {
            verified_email: store.get(KEY_VERIFIED_EMAIL)?,
            verification_reference: store.get(KEY_VERIFICATION_REFERENCE)?,
            verification_status,
            storage_schema_version: current_version.to_string(),
        },
        erased_version: None,
    })
}

/// Wipe all four keys and rewrite the schema version.
pub fn clear_record(store: &dyn PreferenceStore, current_version: &str) -> Result<(), StoreError> {
    store.remove_many(&RECORD_KEYS)?;
    store.set(KEY_STORAGE_VERSION, current_version)
}

/// Persist a terminal outcome.
///
/// `verified` writes email, reference and `completed`; `declined`/`error`
/// write the reference and `failed`; `pending` writes the reference and
/// clears any earlier status.
/// Returns the status that was written, if any.
pub fn save_outcome(
    store: &dyn PreferenceStore,
    outcome: &VerificationOutcome,
    email: Option<&str>,
) -> Result<Option<RecordStatus>, StoreError> {
    store.set(KEY_VERIFICATION_REFERENCE, &outcome.reference)?;

    let status = RecordStatus::for_status(outcome.status);
    match status {
        Some(status) => store.set(KEY_VERIFICATION_STATUS, status.as_str())?,
        None => store.remove(KEY_VERIFICATION_STATUS)?,
    }

    if outcome.status == VerificationStatus::Verified {
        match email {
            Some(email) => store.set(KEY_VERIFIED_EMAIL, email)?,
            None => store.remove(KEY_VERIFIED_EMAIL)?,
        }
    }

    Ok(status)
}
