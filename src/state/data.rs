/// Shared data structures for the edit core
///
/// These structs represent the data model that flows between
/// the storage layer and the edit session.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage format for calendar dates (ISO-8601, no time component)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single activity entry as persisted in the record store
///
/// Serialized to JSON as part of the whole collection. The photo field is
/// omitted from the JSON entirely when no photo is attached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique record ID, assigned at creation time and never changed
    pub id: i64,
    /// Short title shown in the listing
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Calendar date as "YYYY-MM-DD"
    pub date: String,
    /// Inline photo as a data URI ("data:image/png;base64,..."), None = no photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl Record {
    /// Parse the stored date string into a calendar date
    ///
    /// Returns None if the field is empty or malformed. The stored string
    /// and the parsed date round-trip through DATE_FORMAT without drift.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// A mutable working copy of a Record, owned by the active edit session
///
/// The draft is never written to the store piecemeal; only a fully
/// validated draft is committed. The photo epoch counts attach and detach
/// operations so that an encode finishing after a newer attach or a detach
/// is recognized as stale and dropped instead of clobbering the draft.
#[derive(Debug, Clone)]
pub struct Draft {
    record: Record,
    photo_epoch: u64,
}

impl Draft {
    /// Materialize a draft from a stored record
    pub fn from_record(record: Record) -> Self {
        Self {
            record,
            photo_epoch: 0,
        }
    }

    /// The current field values of the draft
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn set_title(&mut self, title: &str) {
        self.record.title = title.to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.record.description = description.to_string();
    }

    pub fn set_date_str(&mut self, date: &str) {
        self.record.date = date.to_string();
    }

    /// Set the date from a typed calendar date, formatted as "YYYY-MM-DD"
    pub fn set_date(&mut self, date: NaiveDate) {
        self.record.date = date.format(DATE_FORMAT).to_string();
    }

    /// Start a new photo upload
    ///
    /// Returns the epoch tag the eventual encode result must carry. Any
    /// encode issued under an earlier tag becomes stale from this point.
    pub fn begin_photo_upload(&mut self) -> u64 {
        self.photo_epoch += 1;
        self.photo_epoch
    }

    /// Apply an encoded photo if its tag is still current
    ///
    /// Returns false and leaves the draft unchanged for stale completions.
    pub fn accept_photo(&mut self, epoch: u64, data_uri: String) -> bool {
        if epoch != self.photo_epoch {
            return false;
        }
        self.record.photo = Some(data_uri);
        true
    }

    /// Remove the photo, invalidating any encode still in flight
    ///
    /// Calling this with no photo attached leaves the record as it was.
    pub fn clear_photo(&mut self) {
        self.photo_epoch += 1;
        self.record.photo = None;
    }
}
