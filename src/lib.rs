/// Activity record editing core
///
/// Loads an activity by ID, lets the caller mutate a draft, validates it on
/// submit, encodes uploaded photos into data URIs, and commits the draft
/// back to a local record store. Presentation is out of scope: rendering,
/// toasts and route changes live behind the traits in shell.

pub mod photo;
pub mod shell;
pub mod state;

pub use photo::ingest::{PhotoError, PhotoFile, ACCEPTED_MIME_TYPES};
pub use shell::{Navigator, Notice, Notifier, Severity, DEFAULT_NOTICE_DURATION_MS};
pub use state::data::{Draft, Record, DATE_FORMAT};
pub use state::session::{
    EditSession, EncodedPhoto, Field, PhotoUpload, SessionState, SubmitOutcome,
};
pub use state::store::{
    MemorySlot, RecordStore, Slot, SqliteSlot, StoreError, ACTIVITIES_KEY,
};
pub use state::validate::{validate, FieldErrors};
