use std::rc::Rc;

use tracing::warn;

use crate::medium::StorageMedium;
use crate::models::{
    LinkDraft, LinkRecord, NoteDraft, Record, ReminderRecord, RoadmapRecord, display_host,
    seed_links, seed_reminders, seed_roadmap,
};
use crate::records::RecordList;
use crate::store::PersistentStore;

pub const LINKS_KEY: &str = "mine_links";
pub const REMINDERS_KEY: &str = "mine_reminders";
pub const ROADMAP_KEY: &str = "mine_roadmap";
pub const KEYS: [&str; 3] = [LINKS_KEY, REMINDERS_KEY, ROADMAP_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Links,
    Reminders,
    Roadmap,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Links, Tab::Reminders, Tab::Roadmap];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Links => "Links",
            Tab::Reminders => "Reminders",
            Tab::Roadmap => "Roadmap",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Links => 0,
            Tab::Reminders => 1,
            Tab::Roadmap => 2,
        }
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    /// Labels of the two form fields for this tab.
    pub fn field_labels(self) -> [&'static str; 2] {
        match self {
            Tab::Links => ["Name", "URL"],
            Tab::Reminders | Tab::Roadmap => ["Title", "Body"],
        }
    }
}

/// What the view needs to draw one card, independent of the record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: u64,
    pub label: String,
    pub detail: String,
    pub variant: usize,
    /// Link host, `None` for malformed links and for non-link cards.
    pub host: Option<String>,
}

/// One record list per tab, all wired the same way.
pub struct Dashboard {
    pub links: RecordList<LinkRecord>,
    pub reminders: RecordList<ReminderRecord>,
    pub roadmap: RecordList<RoadmapRecord>,
}

impl Dashboard {
    /// Persistent when a store is given, seeded in-memory lists otherwise.
    pub fn open(store: Option<PersistentStore>) -> Self {
        Self {
            links: RecordList::open(LINKS_KEY, seed_links(), store.clone()),
            reminders: RecordList::open(REMINDERS_KEY, seed_reminders(), store.clone()),
            roadmap: RecordList::open(ROADMAP_KEY, seed_roadmap(), store),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(None)
    }

    pub fn len(&self, tab: Tab) -> usize {
        match tab {
            Tab::Links => self.links.len(),
            Tab::Reminders => self.reminders.len(),
            Tab::Roadmap => self.roadmap.len(),
        }
    }

    pub fn cards(&self, tab: Tab) -> Vec<Card> {
        match tab {
            Tab::Links => self.links.records().iter().map(link_card).collect(),
            Tab::Reminders => self.reminders.records().iter().map(note_card).collect(),
            Tab::Roadmap => self.roadmap.records().iter().map(note_card).collect(),
        }
    }

    pub fn card_at(&self, tab: Tab, idx: usize) -> Option<Card> {
        match tab {
            Tab::Links => self.links.records().get(idx).map(link_card),
            Tab::Reminders => self.reminders.records().get(idx).map(note_card),
            Tab::Roadmap => self.roadmap.records().get(idx).map(note_card),
        }
    }

    pub fn label_of(&self, tab: Tab, id: u64) -> Option<String> {
        match tab {
            Tab::Links => self.links.get(id).map(|r| r.label().to_string()),
            Tab::Reminders => self.reminders.get(id).map(|r| r.label().to_string()),
            Tab::Roadmap => self.roadmap.get(id).map(|r| r.label().to_string()),
        }
    }

    /// Current editable fields of a record, in form order.
    pub fn form_fields(&self, tab: Tab, id: u64) -> Option<[String; 2]> {
        match tab {
            Tab::Links => self.links.get(id).map(|r| {
                let d = r.to_draft();
                [d.name, d.url]
            }),
            Tab::Reminders => self.reminders.get(id).map(|r| note_fields(r.to_draft())),
            Tab::Roadmap => self.roadmap.get(id).map(|r| note_fields(r.to_draft())),
        }
    }

    /// Adds (`target == None`) or edits a record from raw form text.
    /// Returns the id that was written, or `None` when nothing changed.
    pub fn save_form(&mut self, tab: Tab, target: Option<u64>, fields: [String; 2]) -> Option<u64> {
        let [first, second] = fields;
        match tab {
            Tab::Links => {
                let draft = LinkDraft::new(first, second);
                match target {
                    Some(id) => self.links.update(id, draft).map(|r| r.id),
                    None => self.links.add(draft).map(|r| r.id),
                }
            }
            Tab::Reminders => {
                let draft = NoteDraft::new(first, second);
                match target {
                    Some(id) => self.reminders.update(id, draft).map(|r| r.id),
                    None => self.reminders.add(draft).map(|r| r.id),
                }
            }
            Tab::Roadmap => {
                let draft = NoteDraft::new(first, second);
                match target {
                    Some(id) => self.roadmap.update(id, draft).map(|r| r.id),
                    None => self.roadmap.add(draft).map(|r| r.id),
                }
            }
        }
    }

    pub fn remove(&mut self, tab: Tab, id: u64) -> bool {
        match tab {
            Tab::Links => self.links.remove(id),
            Tab::Reminders => self.reminders.remove(id),
            Tab::Roadmap => self.roadmap.remove(id),
        }
    }

    pub fn position(&self, tab: Tab, id: u64) -> Option<usize> {
        match tab {
            Tab::Links => self.links.position(id),
            Tab::Reminders => self.reminders.position(id),
            Tab::Roadmap => self.roadmap.position(id),
        }
    }
}

/// Drops every stored tab collection from `medium`.
pub fn reset_stored(medium: Rc<dyn StorageMedium>) -> bool {
    let store = PersistentStore::new(medium);
    let mut all_cleared = true;
    for key in KEYS {
        if !store.clear(key) {
            warn!(key, "stored collection was not reset");
            all_cleared = false;
        }
    }
    all_cleared
}

fn link_card(record: &LinkRecord) -> Card {
    Card {
        id: record.id,
        label: record.name.clone(),
        detail: record.url.clone(),
        variant: record.color,
        host: display_host(&record.url),
    }
}

fn note_card<R>(record: &R) -> Card
where
    R: Record<Draft = NoteDraft>,
{
    let draft = record.to_draft();
    Card {
        id: record.id(),
        label: draft.title,
        detail: draft.body,
        variant: record.variant(),
        host: None,
    }
}

fn note_fields(draft: NoteDraft) -> [String; 2] {
    [draft.title, draft.body]
}
