/// The edit session state machine
///
/// One session governs one edit lifecycle: load a record by ID, mutate the
/// draft, validate on submit, commit back to the store. The session owns
/// its draft exclusively and runs on one logical thread of control. The
/// only suspension point is photo encoding, which the caller drives by
/// awaiting the returned PhotoUpload and handing the result back through
/// photo_encoded.

use chrono::NaiveDate;

use super::data::{Draft, Record};
use super::store::{RecordStore, StoreError};
use super::validate::{self, FieldErrors};
use crate::photo::ingest::{self, PhotoFile};
use crate::shell::{Navigator, Notice, Notifier};

const UPDATED_MESSAGE: &str = "Activity updated successfully!";
const PHOTO_REMOVED_MESSAGE: &str = "Photo deleted successfully!";
const INVALID_IMAGE_MESSAGE: &str = "Only PNG, JPEG, and JPG images are allowed!";

/// Lifecycle states of an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Looking up the record
    Loading,
    /// Draft materialized, accepting edits
    Ready,
    /// Submit in progress
    Submitting,
    /// Draft committed, session over
    Committed,
    /// Session ended without persisting (cancel, or record not found)
    Abandoned,
}

/// Result of a submit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Draft validated and written to the store
    Committed,
    /// One or more fields failed validation; draft kept, session stays Ready
    Invalid,
    /// Submit arrived outside Ready; nothing happened
    Ignored,
}

/// Editable text fields of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Date,
}

/// An accepted upload waiting to be encoded
///
/// Produced by attach_photos, consumed by awaiting encode. The epoch tag
/// ties the eventual result to the draft state that requested it.
#[derive(Debug)]
pub struct PhotoUpload {
    epoch: u64,
    file: PhotoFile,
}

impl PhotoUpload {
    /// Encode the payload into a data URI
    ///
    /// The caller feeds the result to EditSession::photo_encoded, which
    /// decides whether it is still wanted.
    pub async fn encode(self) -> Result<EncodedPhoto, ingest::PhotoError> {
        let data_uri = ingest::encode_data_uri(self.file).await?;
        Ok(EncodedPhoto {
            epoch: self.epoch,
            data_uri,
        })
    }
}

/// A finished encode, tagged with the epoch it was requested under
#[derive(Debug, Clone)]
pub struct EncodedPhoto {
    epoch: u64,
    data_uri: String,
}

/// The stateful orchestrator of one edit lifecycle
pub struct EditSession {
    store: RecordStore,
    notifier: Box<dyn Notifier>,
    navigator: Box<dyn Navigator>,
    state: SessionState,
    draft: Option<Draft>,
    errors: FieldErrors,
}

impl EditSession {
    /// Start an edit session for the record the identifier points at
    ///
    /// The identifier arrives as text, typically a route parameter. A value
    /// that does not parse as an ID and an ID with no matching record are
    /// treated identically: the session comes up Abandoned and a redirect
    /// to the listing is requested, with no error shown to the user.
    /// Only a storage backend failure is an error here.
    pub fn start(
        store: RecordStore,
        notifier: Box<dyn Notifier>,
        navigator: Box<dyn Navigator>,
        id: &str,
    ) -> Result<Self, StoreError> {
        let mut session = EditSession {
            store,
            notifier,
            navigator,
            state: SessionState::Loading,
            draft: None,
            errors: FieldErrors::default(),
        };

        let record = match id.parse::<i64>() {
            Ok(id) => session.store.find_by_id(id)?,
            Err(_) => None,
        };

        match record {
            Some(record) => {
                session.draft = Some(Draft::from_record(record));
                session.state = SessionState::Ready;
            }
            None => {
                session.state = SessionState::Abandoned;
                session.navigator.to_listing();
            }
        }

        Ok(session)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The draft being edited, None once the session has ended
    pub fn draft(&self) -> Option<&Record> {
        self.draft.as_ref().map(|d| d.record())
    }

    /// Validation errors from the latest submit
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Overwrite one text field of the draft
    ///
    /// Ignored unless the session is Ready.
    pub fn edit_field(&mut self, field: Field, value: &str) {
        if self.state != SessionState::Ready {
            return;
        }
        if let Some(draft) = self.draft.as_mut() {
            match field {
                Field::Title => draft.set_title(value),
                Field::Description => draft.set_description(value),
                Field::Date => draft.set_date_str(value),
            }
        }
    }

    /// Set the draft date from a typed calendar date
    ///
    /// Stored as "YYYY-MM-DD", the same shape the date field always holds.
    pub fn set_date(&mut self, date: NaiveDate) {
        if self.state != SessionState::Ready {
            return;
        }
        if let Some(draft) = self.draft.as_mut() {
            draft.set_date(date);
        }
    }

    /// Offer uploaded files to the draft
    ///
    /// Only the first file is considered; the rest are silently ignored. A
    /// file that fails the accept policy produces an error notice and
    /// leaves the draft untouched. On acceptance the returned PhotoUpload
    /// must be encoded and its result handed to photo_encoded; until then
    /// the draft keeps its previous photo.
    pub fn attach_photos(&mut self, files: Vec<PhotoFile>) -> Option<PhotoUpload> {
        if self.state != SessionState::Ready {
            return None;
        }
        let file = files.into_iter().next()?;

        if ingest::validate(&file).is_err() {
            self.notifier.notify(Notice::error(INVALID_IMAGE_MESSAGE));
            return None;
        }

        let draft = self.draft.as_mut()?;
        let epoch = draft.begin_photo_upload();
        Some(PhotoUpload { epoch, file })
    }

    /// Deliver a finished encode to the draft
    ///
    /// Applied only while the tag still matches the draft's photo epoch; a
    /// result overtaken by a newer attach or a detach is dropped.
    pub fn photo_encoded(&mut self, photo: EncodedPhoto) {
        if self.state != SessionState::Ready {
            return;
        }
        if let Some(draft) = self.draft.as_mut() {
            if !draft.accept_photo(photo.epoch, photo.data_uri) {
                eprintln!("⚠️  Dropped stale photo encode");
            }
        }
    }

    /// Remove the draft's photo
    ///
    /// Unconditional and idempotent. Also invalidates any encode still in
    /// flight, so a late result cannot restore the photo.
    pub fn detach_photo(&mut self) {
        if self.state != SessionState::Ready {
            return;
        }
        if let Some(draft) = self.draft.as_mut() {
            draft.clear_photo();
            self.notifier.notify(Notice::info(PHOTO_REMOVED_MESSAGE));
        }
    }

    /// Validate the draft and, if it passes, commit it to the store
    ///
    /// Validation failure keeps the session Ready with the errors readable
    /// through errors(); the user corrects fields and resubmits, any number
    /// of times. On success the record is written synchronously, a success
    /// notice goes out, and navigation back to the listing is requested.
    /// A backend write failure leaves the session Ready with the draft
    /// intact and propagates the error.
    pub fn submit(&mut self) -> Result<SubmitOutcome, StoreError> {
        if self.state != SessionState::Ready {
            return Ok(SubmitOutcome::Ignored);
        }
        let record = match self.draft.as_ref() {
            Some(draft) => draft.record().clone(),
            None => return Ok(SubmitOutcome::Ignored),
        };
        self.state = SessionState::Submitting;

        self.errors = validate::validate(&record);
        if !self.errors.is_empty() {
            self.state = SessionState::Ready;
            return Ok(SubmitOutcome::Invalid);
        }

        if let Err(e) = self.store.upsert(&record) {
            self.state = SessionState::Ready;
            return Err(e);
        }

        self.draft = None;
        self.state = SessionState::Committed;
        self.notifier.notify(Notice::success(UPDATED_MESSAGE));
        self.navigator.to_listing();
        Ok(SubmitOutcome::Committed)
    }

    /// Abandon the session without persisting anything
    ///
    /// The draft is discarded and navigation back to the listing requested.
    pub fn cancel(&mut self) {
        if self.state != SessionState::Ready {
            return;
        }
        self.draft = None;
        self.state = SessionState::Abandoned;
        self.navigator.to_listing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{Severity, DEFAULT_NOTICE_DURATION_MS};
    use crate::state::store::{MemorySlot, Slot, ACTIVITIES_KEY};
    use std::cell::RefCell;
    use std::rc::Rc;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

    #[derive(Clone, Default)]
    struct TestNotifier(Rc<RefCell<Vec<Notice>>>);

    impl Notifier for TestNotifier {
        fn notify(&self, notice: Notice) {
            self.0.borrow_mut().push(notice);
        }
    }

    #[derive(Clone, Default)]
    struct TestNavigator(Rc<RefCell<usize>>);

    impl Navigator for TestNavigator {
        fn to_listing(&self) {
            *self.0.borrow_mut() += 1;
        }
    }

    /// Slot whose writes always fail, for the backend-failure path
    struct BrokenSlot(MemorySlot);

    impl Slot for BrokenSlot {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    struct Harness {
        slot: MemorySlot,
        notices: Rc<RefCell<Vec<Notice>>>,
        redirects: Rc<RefCell<usize>>,
        session: EditSession,
    }

    fn seed() -> Record {
        Record {
            id: 1,
            title: "A".to_string(),
            description: "d".to_string(),
            date: "2024-01-01".to_string(),
            photo: None,
        }
    }

    fn seeded_slot(records: &[Record]) -> MemorySlot {
        let slot = MemorySlot::new();
        slot.set(ACTIVITIES_KEY, &serde_json::to_string(records).unwrap())
            .unwrap();
        slot
    }

    fn start(records: &[Record], id: &str) -> Harness {
        let slot = seeded_slot(records);
        let notifier = TestNotifier::default();
        let navigator = TestNavigator::default();
        let notices = notifier.0.clone();
        let redirects = navigator.0.clone();

        let store = RecordStore::new(Box::new(slot.clone()));
        let session =
            EditSession::start(store, Box::new(notifier), Box::new(navigator), id).unwrap();

        Harness {
            slot,
            notices,
            redirects,
            session,
        }
    }

    fn stored(slot: &MemorySlot) -> Vec<Record> {
        serde_json::from_str(&slot.get(ACTIVITIES_KEY).unwrap().unwrap()).unwrap()
    }

    fn png_upload() -> PhotoFile {
        PhotoFile {
            name: "photo.png".to_string(),
            mime: "image/png".to_string(),
            bytes: PNG_MAGIC.to_vec(),
        }
    }

    #[test]
    fn test_start_materializes_draft() {
        let h = start(&[seed()], "1");
        assert_eq!(h.session.state(), SessionState::Ready);
        assert_eq!(h.session.draft(), Some(&seed()));
        assert_eq!(*h.redirects.borrow(), 0);
    }

    #[test]
    fn test_start_unknown_id_abandons_and_redirects() {
        let h = start(&[seed()], "99");
        assert_eq!(h.session.state(), SessionState::Abandoned);
        assert!(h.session.draft().is_none());
        assert_eq!(*h.redirects.borrow(), 1);
        // Returned to the listing silently, no error dialog
        assert!(h.notices.borrow().is_empty());
    }

    #[test]
    fn test_start_unparseable_id_behaves_like_not_found() {
        let h = start(&[seed()], "not-a-number");
        assert_eq!(h.session.state(), SessionState::Abandoned);
        assert_eq!(*h.redirects.borrow(), 1);
        assert!(h.notices.borrow().is_empty());
    }

    #[test]
    fn test_submit_with_empty_title_keeps_store_unchanged() {
        let mut h = start(&[seed()], "1");
        h.session.edit_field(Field::Title, "");

        let outcome = h.session.submit().unwrap();

        assert_eq!(outcome, SubmitOutcome::Invalid);
        assert_eq!(h.session.state(), SessionState::Ready);
        assert_eq!(
            h.session.errors().title.as_deref(),
            Some("Title is required")
        );
        assert_eq!(stored(&h.slot), vec![seed()]);
        assert_eq!(*h.redirects.borrow(), 0);
    }

    #[test]
    fn test_submit_persists_edit_and_navigates() {
        let mut h = start(&[seed()], "1");
        h.session.edit_field(Field::Title, "B");

        let outcome = h.session.submit().unwrap();

        assert_eq!(outcome, SubmitOutcome::Committed);
        assert_eq!(h.session.state(), SessionState::Committed);
        assert!(h.session.draft().is_none());

        let expected = Record {
            title: "B".to_string(),
            ..seed()
        };
        assert_eq!(stored(&h.slot), vec![expected]);

        let notices = h.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Success);
        assert_eq!(notices[0].message, "Activity updated successfully!");
        assert_eq!(notices[0].duration_ms, DEFAULT_NOTICE_DURATION_MS);
        assert_eq!(*h.redirects.borrow(), 1);
    }

    #[test]
    fn test_resubmit_after_fixing_errors() {
        let mut h = start(&[seed()], "1");
        h.session.edit_field(Field::Title, "  ");
        assert_eq!(h.session.submit().unwrap(), SubmitOutcome::Invalid);

        h.session.edit_field(Field::Title, "B");
        assert_eq!(h.session.submit().unwrap(), SubmitOutcome::Committed);
        assert!(h.session.errors().is_empty());
    }

    #[test]
    fn test_committed_draft_round_trips_through_store() {
        let mut h = start(&[seed()], "1");
        h.session.edit_field(Field::Description, "10k, hill repeats");
        h.session
            .set_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let submitted = h.session.draft().unwrap().clone();
        h.session.submit().unwrap();

        let store = RecordStore::new(Box::new(h.slot.clone()));
        assert_eq!(store.find_by_id(1).unwrap().unwrap(), submitted);
        assert_eq!(submitted.date, "2024-02-29");
    }

    #[test]
    fn test_cancel_discards_edits() {
        let mut h = start(&[seed()], "1");
        h.session.edit_field(Field::Title, "never stored");
        h.session.cancel();

        assert_eq!(h.session.state(), SessionState::Abandoned);
        assert!(h.session.draft().is_none());
        assert_eq!(stored(&h.slot), vec![seed()]);
        assert_eq!(*h.redirects.borrow(), 1);
    }

    #[test]
    fn test_mutations_ignored_after_session_ends() {
        let mut h = start(&[seed()], "1");
        h.session.cancel();

        h.session.edit_field(Field::Title, "B");
        h.session.detach_photo();
        assert!(h.session.attach_photos(vec![png_upload()]).is_none());
        assert_eq!(h.session.submit().unwrap(), SubmitOutcome::Ignored);

        assert_eq!(stored(&h.slot), vec![seed()]);
        // Only the cancel redirect, nothing from the ignored calls
        assert_eq!(*h.redirects.borrow(), 1);
    }

    #[test]
    fn test_attach_rejects_unsupported_type() {
        let mut h = start(&[seed()], "1");
        let gif = PhotoFile {
            name: "anim.gif".to_string(),
            mime: "image/gif".to_string(),
            bytes: b"GIF89a".to_vec(),
        };

        assert!(h.session.attach_photos(vec![gif]).is_none());

        assert_eq!(h.session.draft().unwrap().photo, None);
        let notices = h.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert_eq!(
            notices[0].message,
            "Only PNG, JPEG, and JPG images are allowed!"
        );
    }

    #[tokio::test]
    async fn test_attach_encode_apply() {
        let mut h = start(&[seed()], "1");

        let upload = h.session.attach_photos(vec![png_upload()]).unwrap();
        // Encoding is in flight; the draft still shows no photo
        assert_eq!(h.session.draft().unwrap().photo, None);

        let encoded = upload.encode().await.unwrap();
        h.session.photo_encoded(encoded);

        let photo = h.session.draft().unwrap().photo.clone().unwrap();
        assert!(photo.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_only_first_file_processed() {
        let mut h = start(&[seed()], "1");
        let second = PhotoFile {
            name: "other.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: JPEG_MAGIC.to_vec(),
        };

        let upload = h.session.attach_photos(vec![png_upload(), second]).unwrap();
        let encoded = upload.encode().await.unwrap();
        h.session.photo_encoded(encoded);

        let photo = h.session.draft().unwrap().photo.clone().unwrap();
        assert!(photo.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_detach_drops_stale_encode() {
        let mut h = start(&[seed()], "1");

        let upload = h.session.attach_photos(vec![png_upload()]).unwrap();
        h.session.detach_photo();

        // The encode completes after the user already removed the photo
        let encoded = upload.encode().await.unwrap();
        h.session.photo_encoded(encoded);

        assert_eq!(h.session.draft().unwrap().photo, None);
    }

    #[tokio::test]
    async fn test_newer_attach_wins_over_older_encode() {
        let mut h = start(&[seed()], "1");

        let first = h.session.attach_photos(vec![png_upload()]).unwrap();
        let second_file = PhotoFile {
            name: "newer.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: JPEG_MAGIC.to_vec(),
        };
        let second = h.session.attach_photos(vec![second_file]).unwrap();

        // Completion order inverted: the older encode lands last
        let second_encoded = second.encode().await.unwrap();
        let first_encoded = first.encode().await.unwrap();
        h.session.photo_encoded(second_encoded);
        h.session.photo_encoded(first_encoded);

        let photo = h.session.draft().unwrap().photo.clone().unwrap();
        assert!(photo.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_detach_photo_is_idempotent() {
        let mut h = start(
            &[Record {
                photo: Some("data:image/png;base64,AAAA".to_string()),
                ..seed()
            }],
            "1",
        );

        h.session.detach_photo();
        let after_first = h.session.draft().unwrap().clone();
        h.session.detach_photo();

        assert_eq!(h.session.draft(), Some(&after_first));
        assert_eq!(after_first.photo, None);
        // The removal notice still fires each time
        let notices = h.notices.borrow();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.severity == Severity::Info));
    }

    #[test]
    fn test_backend_write_failure_keeps_session_ready() {
        let slot = seeded_slot(&[seed()]);
        let store = RecordStore::new(Box::new(BrokenSlot(slot.clone())));
        let mut session = EditSession::start(
            store,
            Box::new(TestNotifier::default()),
            Box::new(TestNavigator::default()),
            "1",
        )
        .unwrap();
        session.edit_field(Field::Title, "B");

        assert!(session.submit().is_err());

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.draft().unwrap().title, "B");
        // Nothing was persisted through the broken backend
        assert_eq!(stored(&slot), vec![seed()]);
    }
}
