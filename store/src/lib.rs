//! Preference storage for the KYC host app.
//!
//! The host keeps a handful of string fields in a small key-value store.
//! Every backend (JSON file, in-memory for testing) implements
//! [`PreferenceStore`]; the rest of the codebase depends only on the trait.

pub mod error;
pub mod json_file;
pub mod preference;
pub mod record;

pub use error::StoreError;
pub use json_file::JsonFileStore;
pub use preference::PreferenceStore;
pub use record::{
    clear_record, load_record, save_outcome, LoadedRecord, PersistedVerificationRecord,
    RecordStatus, CURRENT_SCHEMA_VERSION,
};
