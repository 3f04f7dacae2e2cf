use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::models::Record;
use crate::store::PersistentStore;

/// Hands out millisecond-timestamp ids that never repeat.
///
/// Each id is `max(now_ms, last + 1)`, so two records created within the
/// same clock tick still get distinct, increasing ids. Once `last` reaches
/// `u64::MAX` there is nothing left above it and the allocator yields `None`.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    /// An allocator whose ids are all greater than `floor`.
    pub fn after(floor: u64) -> Self {
        Self { last: floor }
    }

    pub fn next_id(&mut self) -> Option<u64> {
        self.next_at(now_millis())
    }

    pub fn next_at(&mut self, now_ms: u64) -> Option<u64> {
        let id = now_ms.max(self.last.checked_add(1)?);
        self.last = id;
        Some(id)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Ordered collection of one kind of record, optionally backed by a store.
///
/// Insertion order is display order. Every successful mutation is written
/// through to the store under `key`.
pub struct RecordList<R: Record> {
    key: &'static str,
    records: Vec<R>,
    store: Option<PersistentStore>,
    ids: IdAllocator,
}

impl<R: Record> RecordList<R> {
    /// Loads `key` from the store, falling back to `seed`. Stored lists that
    /// repeat an id are discarded.
    pub fn open(key: &'static str, seed: Vec<R>, store: Option<PersistentStore>) -> Self {
        let records = match &store {
            Some(store) => {
                let loaded = store.load(key, seed.clone());
                if has_unique_ids(&loaded) {
                    loaded
                } else {
                    warn!(key, "stored records repeat an id, using defaults");
                    seed
                }
            }
            None => seed,
        };
        let floor = records.iter().map(R::id).max().unwrap_or(0);
        debug!(key, count = records.len(), persistent = store.is_some(), "opened record list");
        Self {
            key,
            records,
            store,
            ids: IdAllocator::after(floor),
        }
    }

    pub fn in_memory(key: &'static str, seed: Vec<R>) -> Self {
        Self::open(key, seed, None)
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub fn get(&self, id: u64) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn position(&self, id: u64) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Appends a new record, or does nothing when a required field is blank.
    pub fn add(&mut self, draft: R::Draft) -> Option<&R> {
        if !R::is_complete(&draft) {
            debug!(key = self.key, "ignoring add with blank required field");
            return None;
        }
        let id = match self.ids.next_id() {
            Some(id) => id,
            None => self.lowest_free_id(),
        };
        let variant = self.records.len() % R::PALETTE_SIZE;
        self.records.push(R::create(id, variant, draft));
        debug!(key = self.key, id, variant, "record added");
        self.persist();
        self.records.last()
    }

    /// Replaces the editable fields of record `id`. Unknown ids and blank
    /// required fields leave the list untouched.
    pub fn update(&mut self, id: u64, draft: R::Draft) -> Option<&R> {
        if !R::is_complete(&draft) {
            debug!(key = self.key, id, "ignoring update with blank required field");
            return None;
        }
        let idx = self.position(id)?;
        self.records[idx].apply(draft);
        debug!(key = self.key, id, "record updated");
        self.persist();
        self.records.get(idx)
    }

    /// Returns whether a record was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.records.remove(idx);
        debug!(key = self.key, id, "record removed");
        self.persist();
        true
    }

    fn lowest_free_id(&self) -> u64 {
        let mut taken: Vec<u64> = self.records.iter().map(R::id).collect();
        taken.sort_unstable();
        let mut candidate = 1;
        for id in taken {
            if id == candidate {
                candidate += 1;
            } else if id > candidate {
                break;
            }
        }
        candidate
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            store.save(self.key, &self.records);
        }
    }
}

fn has_unique_ids<R: Record>(records: &[R]) -> bool {
    let mut ids: Vec<u64> = records.iter().map(R::id).collect();
    ids.sort_unstable();
    ids.windows(2).all(|pair| pair[0] != pair[1])
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::medium::{DisabledMedium, MemoryMedium, StorageMedium};
    use crate::models::{
        LinkDraft, LinkRecord, NoteDraft, ReminderRecord, RoadmapRecord, seed_links,
        seed_reminders,
    };

    fn reminders() -> RecordList<ReminderRecord> {
        RecordList::in_memory("mine_reminders", seed_reminders())
    }

    #[test]
    fn test_allocator_is_strictly_increasing_within_a_tick() {
        let mut ids = IdAllocator::after(0);
        let a = ids.next_at(1_000);
        let b = ids.next_at(1_000);
        let c = ids.next_at(999);
        assert_eq!((a, b, c), (Some(1_000), Some(1_001), Some(1_002)));
        assert_eq!(ids.next_at(5_000), Some(5_000));
    }

    #[test]
    fn test_allocator_starts_above_floor() {
        let mut ids = IdAllocator::after(u64::MAX - 1);
        assert_eq!(ids.next_at(3), Some(u64::MAX));
        assert_eq!(ids.next_at(3), None);
    }

    #[test]
    fn test_adds_after_max_id_stay_unique() {
        let medium = Rc::new(MemoryMedium::new());
        medium
            .set(
                "mine_reminders",
                &format!(r#"[{{"id":{},"title":"t","body":"","palette":0}}]"#, u64::MAX),
            )
            .unwrap();
        let mut list: RecordList<ReminderRecord> = RecordList::open(
            "mine_reminders",
            Vec::new(),
            Some(PersistentStore::new(medium)),
        );

        let a = list.add(NoteDraft::new("a", "")).unwrap().id;
        let b = list.add(NoteDraft::new("b", "")).unwrap().id;

        assert_eq!((a, b), (1, 2));
        assert!(list.remove(a));
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(u64::MAX).unwrap().title, "t");
        assert_eq!(list.add(NoteDraft::new("c", "")).unwrap().id, 1);
    }

    #[test]
    fn test_stored_duplicate_ids_fall_back_to_seed() {
        let medium = Rc::new(MemoryMedium::new());
        medium
            .set(
                "mine_reminders",
                r#"[{"id":7,"title":"a","body":"","palette":0},{"id":7,"title":"b","body":"","palette":1}]"#,
            )
            .unwrap();
        let list = RecordList::open(
            "mine_reminders",
            seed_reminders(),
            Some(PersistentStore::new(medium)),
        );
        assert_eq!(list.records(), seed_reminders().as_slice());
    }

    #[test]
    fn test_add_appends_with_fresh_id() {
        let mut list = reminders();
        let before: Vec<u64> = list.records().iter().map(|r| r.id).collect();

        let added = list.add(NoteDraft::new("New", "")).unwrap().clone();

        assert_eq!(list.len(), 4);
        assert!(!before.contains(&added.id));
        assert_eq!(list.records().last(), Some(&added));
    }

    #[test]
    fn test_rapid_adds_never_collide() {
        let mut list = reminders();
        for i in 0..50 {
            list.add(NoteDraft::new(format!("r{i}"), "")).unwrap();
        }
        let mut ids: Vec<u64> = list.records().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 53);
    }

    #[test]
    fn test_variant_comes_from_length_at_creation() {
        let mut list: RecordList<RoadmapRecord> = RecordList::in_memory("mine_roadmap", Vec::new());
        for i in 0..7 {
            list.add(NoteDraft::new(format!("ch{i}"), "")).unwrap();
        }
        let books: Vec<usize> = list.records().iter().map(|r| r.book).collect();
        assert_eq!(books, vec![0, 1, 2, 3, 4, 0, 1]);

        let first = list.records()[0].id;
        list.remove(first);
        assert_eq!(list.records()[0].book, 1);
        let added = list.add(NoteDraft::new("again", "")).unwrap();
        assert_eq!(added.book, 6 % 5);
    }

    #[test]
    fn test_blank_required_field_is_ignored() {
        let mut list = reminders();
        assert!(list.add(NoteDraft::new("", "body")).is_none());
        assert!(list.add(NoteDraft::new("   \t", "body")).is_none());
        assert_eq!(list.records(), seed_reminders().as_slice());

        let mut links = RecordList::in_memory("mine_links", seed_links());
        assert!(links.add(LinkDraft::new("Foo", " ")).is_none());
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn test_update_touches_only_editable_fields() {
        let mut list = reminders();
        let target = list.records()[1].clone();

        let updated = list
            .update(target.id, NoteDraft::new("Drink more", "10 glasses"))
            .unwrap()
            .clone();

        assert_eq!(updated.id, target.id);
        assert_eq!(updated.palette, target.palette);
        assert_eq!(updated.title, "Drink more");
        assert_eq!(updated.body, "10 glasses");
        let seeds = seed_reminders();
        assert_eq!(list.records()[0], seeds[0]);
        assert_eq!(list.records()[2], seeds[2]);
    }

    #[test]
    fn test_link_update_normalizes_url_and_keeps_color() {
        let mut links = RecordList::in_memory("mine_links", seed_links());
        let target = links.records()[2].clone();

        let updated = links
            .update(target.id, LinkDraft::new("  Foo ", "foo.com"))
            .unwrap()
            .clone();

        assert_eq!(updated.id, target.id);
        assert_eq!(updated.color, target.color);
        assert_eq!(updated.name, "Foo");
        assert_eq!(updated.url, "https://foo.com");
        assert_eq!(links.records()[0], seed_links()[0]);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut list = reminders();
        assert!(list.update(999, NoteDraft::new("x", "y")).is_none());
        assert_eq!(list.records(), seed_reminders().as_slice());
    }

    #[test]
    fn test_update_with_blank_title_is_noop() {
        let mut list = reminders();
        assert!(list.update(1, NoteDraft::new(" ", "y")).is_none());
        assert_eq!(list.get(1).unwrap().title, "Call Mom");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut list = reminders();
        assert!(list.remove(2));
        assert_eq!(list.len(), 2);
        assert!(!list.remove(2));
        assert_eq!(list.len(), 2);
        assert!(list.get(2).is_none());
    }

    #[test]
    fn test_mutations_write_through() {
        let medium = Rc::new(MemoryMedium::new());
        let store = PersistentStore::new(medium.clone());
        let mut links = RecordList::open("mine_links", seed_links(), Some(store.clone()));

        links.add(LinkDraft::new("Docs", "docs.rs")).unwrap();
        let raw = medium.get("mine_links").unwrap();
        let stored: Vec<LinkRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, links.records());

        let reopened: RecordList<LinkRecord> =
            RecordList::open("mine_links", Vec::new(), Some(store));
        assert_eq!(reopened.records(), links.records());
    }

    #[test]
    fn test_reopened_list_allocates_above_stored_ids() {
        let medium = Rc::new(MemoryMedium::new());
        let future = u64::MAX / 2;
        medium
            .set(
                "mine_reminders",
                &format!(r#"[{{"id":{future},"title":"t","body":"","palette":0}}]"#),
            )
            .unwrap();
        let mut list: RecordList<ReminderRecord> = RecordList::open(
            "mine_reminders",
            Vec::new(),
            Some(PersistentStore::new(medium)),
        );
        let added = list.add(NoteDraft::new("next", "")).unwrap();
        assert_eq!(added.id, future + 1);
    }

    #[test]
    fn test_failed_persistence_keeps_memory_state() {
        let store = PersistentStore::new(Rc::new(DisabledMedium));
        let mut list = RecordList::open("mine_reminders", seed_reminders(), Some(store));
        list.add(NoteDraft::new("kept", "")).unwrap();
        assert_eq!(list.len(), 4);
        assert!(list.is_persistent());
    }
}
