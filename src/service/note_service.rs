use crate::service::clock::{Clock, IdGenerator};
use crate::storage::local_store::{self, NoteStorage, StorageError};
use crate::storage::note::{Category, Note, NotePatch};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("note title must not be empty")]
    EmptyTitle,

    #[error("note content must not be empty")]
    EmptyContent,

    #[error("note not found: {0}")]
    NotFound(String),
}

/// Owns the authoritative note collection. Every mutation saves the full
/// collection through the storage adapter before returning; a failed save
/// never rolls the mutation back, it is queued as a warning instead.
pub struct NoteService {
    storage: Box<dyn NoteStorage>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    notes: Vec<Note>,
    persist_warning: Option<StorageError>,
}

impl NoteService {
    pub fn new(
        storage: Box<dyn NoteStorage>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        NoteService {
            storage,
            clock,
            ids,
            notes: Vec::new(),
            persist_warning: None,
        }
    }

    /// Load the collection from storage. An absent or unreadable slot seeds
    /// two starter notes, persisted immediately.
    pub fn initialize(&mut self) -> Result<(), StorageError> {
        match self.storage.load()? {
            Some(notes) => {
                debug!(count = notes.len(), "loaded notes from storage");
                self.notes = notes;
            }
            None => {
                self.notes = self.default_notes();
                debug!("no stored notes, seeded defaults");
                self.persist();
            }
        }
        Ok(())
    }

    fn default_notes(&mut self) -> Vec<Note> {
        let now = self.clock.now_ms();
        vec![
            Note {
                id: self.ids.next_id("Welcome!"),
                title: "Welcome!".to_string(),
                content: "This is a simple note app. You can create, edit, and \
                          delete notes. Everything is stored locally."
                    .to_string(),
                category: Category::Personal,
                created_at: now,
                updated_at: now,
            },
            Note {
                id: self.ids.next_id("Project ideas"),
                title: "Project ideas".to_string(),
                content: "Collect ideas for the next side project here.".to_string(),
                category: Category::Idea,
                created_at: now - 100_000,
                updated_at: now - 100_000,
            },
        ]
    }

    /// Create a note. Title and content must be non-empty after trimming;
    /// id and both timestamps are assigned here, never by the caller.
    pub fn create(
        &mut self,
        title: String,
        content: String,
        category: Category,
    ) -> Result<Note, ServiceError> {
        if title.trim().is_empty() {
            return Err(ServiceError::EmptyTitle);
        }
        if content.trim().is_empty() {
            return Err(ServiceError::EmptyContent);
        }

        let now = self.clock.now_ms();
        let note = Note {
            id: self.ids.next_id(&title),
            title,
            content,
            category,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %note.id, "created note");
        self.notes.push(note.clone());
        self.persist();
        Ok(note)
    }

    /// Apply `patch` to the note with `id`. Only supplied fields change;
    /// `updated_at` is bumped, `id` and `created_at` never move.
    pub fn update(&mut self, id: &str, patch: NotePatch) -> Result<Note, ServiceError> {
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(ServiceError::EmptyTitle);
        }
        if matches!(&patch.content, Some(c) if c.trim().is_empty()) {
            return Err(ServiceError::EmptyContent);
        }

        let now = self.clock.now_ms();
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(category) = patch.category {
            note.category = category;
        }
        note.updated_at = now;

        let updated = note.clone();
        debug!(id = %updated.id, "updated note");
        self.persist();
        Ok(updated)
    }

    /// Remove the note with `id`. A missing id is a silent no-op, not an
    /// error. The collection is saved either way, so delete stays a plain
    /// idempotent "make sure it's gone and persisted".
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        let removed = self.notes.len() < before;
        if removed {
            debug!(id, "deleted note");
        }
        self.persist();
        removed
    }

    /// Current collection ordered by recency: descending `updated_at`, ties
    /// broken by ascending id so the order is stable across reads.
    pub fn sorted_view(&self) -> Vec<Note> {
        let mut notes = self.notes.clone();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        notes
    }

    /// Pretty-printed JSON of the full collection in sorted order.
    pub fn export_snapshot(&self) -> Result<String, StorageError> {
        local_store::export_json(&self.sorted_view())
    }

    /// The save failure from the most recent mutation, if any. Draining it
    /// is how the UI surfaces "your change is in memory but didn't reach
    /// disk" without the mutation itself failing.
    pub fn take_persist_warning(&mut self) -> Option<StorageError> {
        self.persist_warning.take()
    }

    fn persist(&mut self) {
        if let Err(e) = self.storage.save(&self.notes) {
            warn!(error = %e, "failed to save notes");
            self.persist_warning = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local_store::MemoryStorage;
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::rc::Rc;

    /// Clock pinned to a shared cell so tests can move time between calls.
    #[derive(Clone)]
    struct FixedClock(Rc<Cell<i64>>);

    impl FixedClock {
        fn new(ms: i64) -> Self {
            FixedClock(Rc::new(Cell::new(ms)))
        }
    }

    impl Clock for FixedClock {
        fn now_ms(&self) -> i64 {
            self.0.get()
        }
    }

    struct SeqIds(u32);

    impl IdGenerator for SeqIds {
        fn next_id(&mut self, _title: &str) -> String {
            self.0 += 1;
            format!("n{}", self.0)
        }
    }

    /// Storage handle the test keeps a reference to after handing it to the
    /// service, so saved state can be inspected from outside.
    #[derive(Clone)]
    struct SharedStorage(Rc<RefCell<MemoryStorage>>);

    impl SharedStorage {
        fn new() -> Self {
            SharedStorage(Rc::new(RefCell::new(MemoryStorage::new())))
        }

        fn with_contents(contents: &str) -> Self {
            SharedStorage(Rc::new(RefCell::new(MemoryStorage::with_contents(
                contents,
            ))))
        }
    }

    impl NoteStorage for SharedStorage {
        fn load(&self) -> Result<Option<Vec<Note>>, StorageError> {
            self.0.borrow().load()
        }

        fn save(&mut self, notes: &[Note]) -> Result<(), StorageError> {
            self.0.borrow_mut().save(notes)
        }
    }

    struct FailingStorage;

    impl NoteStorage for FailingStorage {
        fn load(&self) -> Result<Option<Vec<Note>>, StorageError> {
            Ok(None)
        }

        fn save(&mut self, _notes: &[Note]) -> Result<(), StorageError> {
            Err(StorageError::Io(io::Error::other("quota exceeded")))
        }
    }

    fn service_at(ms: i64) -> (NoteService, SharedStorage) {
        let storage = SharedStorage::new();
        let service = NoteService::new(
            Box::new(storage.clone()),
            Box::new(FixedClock::new(ms)),
            Box::new(SeqIds(0)),
        );
        (service, storage)
    }

    #[test]
    fn empty_slot_seeds_two_default_notes_and_persists_them() {
        let (mut service, storage) = service_at(1_000_000);
        service.initialize().unwrap();

        let view = service.sorted_view();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].title, "Welcome!");
        assert_eq!(view[0].category, Category::Personal);
        assert_eq!(view[1].category, Category::Idea);
        assert_eq!(view[1].updated_at, view[0].updated_at - 100_000);

        // Seed reached storage immediately.
        let saved = storage.load().unwrap().unwrap();
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn malformed_slot_falls_back_to_the_two_seed_notes() {
        let storage = SharedStorage::with_contents("{ definitely not notes ]");
        let mut service = NoteService::new(
            Box::new(storage.clone()),
            Box::new(FixedClock::new(500)),
            Box::new(SeqIds(0)),
        );
        service.initialize().unwrap();

        let view = service.sorted_view();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].title, "Welcome!");
        assert_eq!(view[1].title, "Project ideas");
    }

    #[test]
    fn stored_notes_are_taken_verbatim() {
        let (mut service, storage) = service_at(0);
        {
            let mut inner = storage.clone();
            let notes = vec![Note {
                id: "kept".to_string(),
                title: "Kept".to_string(),
                content: "as stored".to_string(),
                category: Category::Work,
                created_at: 10,
                updated_at: 20,
            }];
            inner.save(&notes).unwrap();
        }
        service.initialize().unwrap();

        let view = service.sorted_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "kept");
        assert_eq!(view[0].updated_at, 20);
    }

    #[test]
    fn create_sets_both_timestamps_and_round_trips_through_storage() {
        let (mut service, storage) = service_at(42_000);
        service.initialize().unwrap();

        let note = service
            .create("Hello".to_string(), "World".to_string(), Category::Idea)
            .unwrap();
        assert_eq!(note.title, "Hello");
        assert_eq!(note.content, "World");
        assert_eq!(note.category, Category::Idea);
        assert_eq!(note.created_at, note.updated_at);

        // Fresh read of the slot sees the new note with identical fields.
        let saved = storage.load().unwrap().unwrap();
        assert!(saved.contains(&note));
    }

    #[test]
    fn create_rejects_blank_title_and_content_without_state_change() {
        let (mut service, _) = service_at(0);
        service.initialize().unwrap();
        let before = service.sorted_view();

        let err = service
            .create("   ".to_string(), "body".to_string(), Category::Work)
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyTitle));

        let err = service
            .create("title".to_string(), "\n".to_string(), Category::Work)
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyContent));

        assert_eq!(service.sorted_view(), before);
    }

    #[test]
    fn ids_stay_unique_across_mutation_sequences() {
        let (mut service, _) = service_at(0);
        service.initialize().unwrap();

        for i in 0..5 {
            service
                .create(format!("t{i}"), "c".to_string(), Category::Todo)
                .unwrap();
        }
        let doomed = service.sorted_view()[0].id.clone();
        service.delete(&doomed);
        service
            .create("another".to_string(), "c".to_string(), Category::Todo)
            .unwrap();

        let view = service.sorted_view();
        let mut ids: Vec<_> = view.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), view.len());
    }

    #[test]
    fn update_changes_only_supplied_fields_and_updated_at() {
        let storage = SharedStorage::new();
        let clock = FixedClock::new(1_000);
        let mut service =
            NoteService::new(Box::new(storage), Box::new(clock), Box::new(SeqIds(0)));
        service.initialize().unwrap();
        let original = service
            .create("Old".to_string(), "body".to_string(), Category::Work)
            .unwrap();

        let updated = service
            .update(
                &original.id,
                NotePatch {
                    title: Some("X".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "X");
        assert_eq!(updated.content, original.content);
        assert_eq!(updated.category, original.category);
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn update_bumps_updated_at_to_the_current_clock() {
        let clock = FixedClock::new(1_000);
        let mut service = NoteService::new(
            Box::new(SharedStorage::new()),
            Box::new(clock.clone()),
            Box::new(SeqIds(0)),
        );
        service.initialize().unwrap();
        let note = service
            .create("t".to_string(), "c".to_string(), Category::Work)
            .unwrap();

        clock.0.set(9_999);
        let updated = service
            .update(
                &note.id,
                NotePatch {
                    category: Some(Category::Todo),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.updated_at, 9_999);
        assert_eq!(updated.created_at, note.created_at);
    }

    #[test]
    fn update_of_unknown_id_is_not_found() {
        let (mut service, _) = service_at(0);
        service.initialize().unwrap();

        let err = service
            .update("missing", NotePatch::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn update_rejects_blank_replacement_fields() {
        let (mut service, _) = service_at(0);
        service.initialize().unwrap();
        let note = service
            .create("t".to_string(), "c".to_string(), Category::Work)
            .unwrap();

        let err = service
            .update(
                &note.id,
                NotePatch {
                    title: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyTitle));
    }

    #[test]
    fn delete_of_unknown_id_is_a_silent_noop() {
        let (mut service, _) = service_at(0);
        service.initialize().unwrap();
        service
            .create("third".to_string(), "c".to_string(), Category::Work)
            .unwrap();
        assert_eq!(service.sorted_view().len(), 3);

        assert!(!service.delete("no-such-id"));
        assert_eq!(service.sorted_view().len(), 3);
    }

    #[test]
    fn delete_removes_and_persists() {
        let (mut service, storage) = service_at(0);
        service.initialize().unwrap();
        let id = service.sorted_view()[0].id.clone();

        assert!(service.delete(&id));
        assert_eq!(service.sorted_view().len(), 1);
        let saved = storage.load().unwrap().unwrap();
        assert!(saved.iter().all(|n| n.id != id));
    }

    #[test]
    fn sorted_view_is_newest_first_with_deterministic_ties() {
        let storage = SharedStorage::new();
        let mut service = NoteService::new(
            Box::new(storage),
            Box::new(FixedClock::new(0)),
            Box::new(SeqIds(0)),
        );
        service.notes = vec![
            Note {
                id: "b".to_string(),
                title: "older".to_string(),
                content: "c".to_string(),
                category: Category::Work,
                created_at: 100,
                updated_at: 100,
            },
            Note {
                id: "c".to_string(),
                title: "newest".to_string(),
                content: "c".to_string(),
                category: Category::Work,
                created_at: 200,
                updated_at: 200,
            },
            Note {
                id: "a".to_string(),
                title: "tied".to_string(),
                content: "c".to_string(),
                category: Category::Work,
                created_at: 100,
                updated_at: 100,
            },
        ];

        let view = service.sorted_view();
        assert_eq!(view[0].updated_at, 200);
        assert!(
            view.windows(2)
                .all(|w| w[0].updated_at >= w[1].updated_at)
        );
        // Equal timestamps order by id.
        assert_eq!(view[1].id, "a");
        assert_eq!(view[2].id, "b");
    }

    #[test]
    fn export_snapshot_is_sorted_and_pretty() {
        let (mut service, _) = service_at(1_000);
        service.initialize().unwrap();

        let json = service.export_snapshot().unwrap();
        let parsed: Vec<Note> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, service.sorted_view());
        assert!(json.contains('\n'));
    }

    #[test]
    fn failed_save_keeps_the_mutation_and_queues_a_warning() {
        let mut service = NoteService::new(
            Box::new(FailingStorage),
            Box::new(FixedClock::new(0)),
            Box::new(SeqIds(0)),
        );
        service.initialize().unwrap();
        assert!(service.take_persist_warning().is_some());

        let note = service
            .create("kept".to_string(), "in memory".to_string(), Category::Work)
            .unwrap();

        assert!(service.sorted_view().iter().any(|n| n.id == note.id));
        assert!(service.take_persist_warning().is_some());
        assert!(service.take_persist_warning().is_none());
    }
}
