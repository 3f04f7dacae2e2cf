use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const LINK_PALETTE_SIZE: usize = 10;
pub const PASTEL_PALETTE_SIZE: usize = 7;
pub const BOOK_PALETTE_SIZE: usize = 5;

const DEFAULT_SCHEME: &str = "https://";

/// Field schema shared by every tab's records.
///
/// A record is created from a `Draft` whose required fields are non-empty
/// after trimming; editing applies a new `Draft` and must keep the id and
/// the variant index untouched.
pub trait Record: Clone + Serialize + DeserializeOwned {
    type Draft;

    const PALETTE_SIZE: usize;

    fn id(&self) -> u64;
    fn variant(&self) -> usize;
    /// Text shown on the card and in the delete confirmation.
    fn label(&self) -> &str;
    fn is_complete(draft: &Self::Draft) -> bool;
    fn create(id: u64, variant: usize, draft: Self::Draft) -> Self;
    fn apply(&mut self, draft: Self::Draft);
    fn to_draft(&self) -> Self::Draft;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub color: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDraft {
    pub name: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReminderRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub palette: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoadmapRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub book: usize,
}

/// Title + free-text body, used by reminders and roadmap chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub body: String,
}

impl LinkDraft {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

impl Record for LinkRecord {
    type Draft = LinkDraft;

    const PALETTE_SIZE: usize = LINK_PALETTE_SIZE;

    fn id(&self) -> u64 {
        self.id
    }

    fn variant(&self) -> usize {
        self.color
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn is_complete(draft: &LinkDraft) -> bool {
        !draft.name.trim().is_empty() && !draft.url.trim().is_empty()
    }

    fn create(id: u64, variant: usize, draft: LinkDraft) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            url: normalize_url(&draft.url),
            color: variant,
        }
    }

    fn apply(&mut self, draft: LinkDraft) {
        self.name = draft.name.trim().to_string();
        self.url = normalize_url(&draft.url);
    }

    fn to_draft(&self) -> LinkDraft {
        LinkDraft::new(self.name.clone(), self.url.clone())
    }
}

impl Record for ReminderRecord {
    type Draft = NoteDraft;

    const PALETTE_SIZE: usize = PASTEL_PALETTE_SIZE;

    fn id(&self) -> u64 {
        self.id
    }

    fn variant(&self) -> usize {
        self.palette
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn is_complete(draft: &NoteDraft) -> bool {
        !draft.title.trim().is_empty()
    }

    fn create(id: u64, variant: usize, draft: NoteDraft) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            body: draft.body,
            palette: variant,
        }
    }

    fn apply(&mut self, draft: NoteDraft) {
        self.title = draft.title.trim().to_string();
        self.body = draft.body;
    }

    fn to_draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.clone(), self.body.clone())
    }
}

impl Record for RoadmapRecord {
    type Draft = NoteDraft;

    const PALETTE_SIZE: usize = BOOK_PALETTE_SIZE;

    fn id(&self) -> u64 {
        self.id
    }

    fn variant(&self) -> usize {
        self.book
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn is_complete(draft: &NoteDraft) -> bool {
        !draft.title.trim().is_empty()
    }

    fn create(id: u64, variant: usize, draft: NoteDraft) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            body: draft.body,
            book: variant,
        }
    }

    fn apply(&mut self, draft: NoteDraft) {
        self.title = draft.title.trim().to_string();
        self.body = draft.body;
    }

    fn to_draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.clone(), self.body.clone())
    }
}

/// Prefixes `https://` unless the text already starts with `http`.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{trimmed}")
    }
}

/// Host part of a link for display, or `None` when the URL is malformed.
pub fn display_host(url: &str) -> Option<String> {
    let normalized = normalize_url(url);
    let (_, rest) = normalized.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (inner, _) = bracketed.split_once(']')?;
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return None;
        }
        return Some(format!("[{}]", inner.to_ascii_lowercase()));
    } else {
        host_port.split(':').next().unwrap_or_default()
    };

    let valid = !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '.' || c == '_');
    valid.then(|| host.to_lowercase())
}

pub fn seed_links() -> Vec<LinkRecord> {
    vec![
        LinkRecord {
            id: 1,
            name: "LinkedIn".into(),
            url: "https://linkedin.com".into(),
            color: 9,
        },
        LinkRecord {
            id: 2,
            name: "GitHub".into(),
            url: "https://github.com".into(),
            color: 0,
        },
        LinkRecord {
            id: 3,
            name: "Dribbble".into(),
            url: "https://dribbble.com".into(),
            color: 4,
        },
    ]
}

pub fn seed_reminders() -> Vec<ReminderRecord> {
    vec![
        ReminderRecord {
            id: 1,
            title: "Call Mom".into(),
            body: "Sunday evening, don't forget!".into(),
            palette: 0,
        },
        ReminderRecord {
            id: 2,
            title: "Drink water".into(),
            body: "8 glasses a day keeps the doctor away.".into(),
            palette: 1,
        },
        ReminderRecord {
            id: 3,
            title: "Read 30 min".into(),
            body: "Before bed. No phone.".into(),
            palette: 3,
        },
    ]
}

pub fn seed_roadmap() -> Vec<RoadmapRecord> {
    vec![
        RoadmapRecord {
            id: 1,
            title: "Learn React Advanced".into(),
            body: "Custom hooks, context patterns, performance optimization with memo and useMemo."
                .into(),
            book: 0,
        },
        RoadmapRecord {
            id: 2,
            title: "Build Portfolio".into(),
            body: "Design it. Ship it. Make it unforgettable.".into(),
            book: 1,
        },
        RoadmapRecord {
            id: 3,
            title: "Open Source Contribution".into(),
            body: "Pick one project. One PR. Just start.".into(),
            book: 2,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_adds_scheme() {
        assert_eq!(normalize_url("foo.com"), "https://foo.com");
        assert_eq!(normalize_url("  foo.com/a "), "https://foo.com/a");
    }

    #[test]
    fn test_normalize_url_keeps_existing_scheme() {
        assert_eq!(normalize_url("http://foo.com"), "http://foo.com");
        assert_eq!(normalize_url("https://foo.com"), "https://foo.com");
    }

    #[test]
    fn test_display_host() {
        assert_eq!(display_host("github.com").as_deref(), Some("github.com"));
        assert_eq!(
            display_host("https://User@Docs.RS:8080/path?q=1").as_deref(),
            Some("docs.rs")
        );
        assert_eq!(display_host("http://[::1]:3000/").as_deref(), Some("[::1]"));
    }

    #[test]
    fn test_display_host_degrades_on_malformed() {
        assert_eq!(display_host("httpfoo"), None);
        assert_eq!(display_host("https://"), None);
        assert_eq!(display_host("not a url"), None);
        assert_eq!(display_host("https://[oops/"), None);
    }

    #[test]
    fn test_link_requires_name_and_url() {
        assert!(LinkRecord::is_complete(&LinkDraft::new("a", "b")));
        assert!(!LinkRecord::is_complete(&LinkDraft::new("  ", "b")));
        assert!(!LinkRecord::is_complete(&LinkDraft::new("a", "\t")));
    }

    #[test]
    fn test_note_body_is_optional() {
        assert!(ReminderRecord::is_complete(&NoteDraft::new("t", "")));
        assert!(!RoadmapRecord::is_complete(&NoteDraft::new(" ", "body")));
    }

    #[test]
    fn test_seed_variants_fit_palettes() {
        assert!(seed_links().iter().all(|r| r.color < LINK_PALETTE_SIZE));
        assert!(seed_reminders().iter().all(|r| r.palette < PASTEL_PALETTE_SIZE));
        assert!(seed_roadmap().iter().all(|r| r.book < BOOK_PALETTE_SIZE));
    }

    #[test]
    fn test_stored_shape_uses_flat_fields() {
        let json = serde_json::to_value(&seed_reminders()[0]).unwrap();
        assert_eq!(json["title"], "Call Mom");
        assert_eq!(json["palette"], 0);
        assert_eq!(json["id"], 1);
    }
}
