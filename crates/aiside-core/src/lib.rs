use serde::{Deserialize, Serialize};

pub mod config;
pub mod keys;

pub use config::{FlagConfig, FlagRule, SummaryConfig};
pub use keys::{CourseKey, UsageKey};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("block not found: {0}")]
    BlockNotFound(String),
    #[error("transcript not found: {0}")]
    TranscriptNotFound(String),
    #[error("block store failed: {0}")]
    Store(String),
    #[error("settings not found: {0}")]
    SettingsNotFound(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("not supported: {0}")]
    NotSupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Format a timestamp the way handler payloads and fragments carry it.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Block category, closed over the tags this crate acts on.
///
/// Anything the host reports that is not one of the known tags (including no tag at all)
/// lands in `Other` and is inert for gating and extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Category {
    /// `html` blocks: raw markup, normalized to text.
    RichText,
    /// `video` blocks: text comes from the transcript.
    Media,
    /// `vertical` blocks: the units the aside attaches to.
    Unit,
    Other(Option<String>),
}

impl Category {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("html") => Self::RichText,
            Some("video") => Self::Media,
            Some("vertical") => Self::Unit,
            other => Self::Other(other.map(str::to_string)),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::RichText => Some("html"),
            Self::Media => Some("video"),
            Self::Unit => Some("vertical"),
            Self::Other(tag) => tag.as_deref(),
        }
    }

    /// Content type reported to the summarization service, if this category carries content.
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            Self::RichText => Some(ContentType::Text),
            Self::Media => Some(ContentType::Video),
            Self::Unit | Self::Other(_) => None,
        }
    }
}

impl From<Option<String>> for Category {
    fn from(tag: Option<String>) -> Self {
        Self::from_tag(tag.as_deref())
    }
}

impl From<Category> for Option<String> {
    fn from(c: Category) -> Self {
        c.tag().map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    Text,
    Video,
}

/// Read-only view of one block's metadata as reported by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMeta {
    pub usage_key: UsageKey,
    /// Stable identity of the block's content definition, already coerced to a string.
    pub definition_id: String,
    pub category: Category,
    pub published_on: Option<Timestamp>,
    pub edited_on: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub definition_id: String,
    pub content_type: ContentType,
    /// Never empty.
    pub content_text: String,
    pub published_on: Option<Timestamp>,
    pub edited_on: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBundle {
    /// Sum of `items[*].content_text` lengths, in characters.
    pub total_length: usize,
    /// In child traversal order.
    pub items: Vec<ExtractedItem>,
}

impl ContentBundle {
    pub fn push(&mut self, item: ExtractedItem) {
        self.total_length += item.content_text.chars().count();
        self.items.push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Host block tree and content store.
///
/// Every call is a plain blocking read; implementations must not cache on behalf of callers.
pub trait BlockStore: Send + Sync {
    /// Direct children of `key`, in traversal order.
    fn children(&self, key: &UsageKey) -> Result<Vec<UsageKey>>;
    fn meta(&self, key: &UsageKey) -> Result<BlockMeta>;
    /// Raw markup. Only meaningful for `Category::RichText` blocks.
    fn html(&self, key: &UsageKey) -> Result<String>;
    /// Plain-text transcript. Fails with `Error::TranscriptNotFound` when none exists.
    fn transcript(&self, key: &UsageKey) -> Result<String>;
}

pub trait FeatureFlags: Send + Sync {
    /// Summaries are shown to staff regardless of course/unit settings.
    fn summary_staff_only(&self, course: &CourseKey) -> bool;
    /// Course and unit enable settings are honored for this course.
    fn summaries_configuration_enabled(&self, course: &CourseKey) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub enabled: bool,
    pub created: Timestamp,
    pub modified: Timestamp,
}

/// Persistence for course defaults and unit overrides.
pub trait SettingsStore: Send + Sync {
    fn course(&self, course: &CourseKey) -> Result<Option<SettingsRecord>>;
    fn set_course(&self, course: &CourseKey, enabled: bool) -> Result<SettingsRecord>;
    /// Returns whether a row was removed.
    fn delete_course(&self, course: &CourseKey) -> Result<bool>;
    fn unit(&self, course: &CourseKey, unit: &UsageKey) -> Result<Option<SettingsRecord>>;
    fn set_unit(&self, course: &CourseKey, unit: &UsageKey, enabled: bool)
        -> Result<SettingsRecord>;
    fn delete_unit(&self, course: &CourseKey, unit: &UsageKey) -> Result<bool>;
    /// Drop every unit override of `course`; returns how many were removed.
    fn reset_course_units(&self, course: &CourseKey) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditState {
    pub enrollment_mode: Option<String>,
}

pub trait UserService {
    fn current_user(&self) -> Option<User>;
}

pub trait CreditService {
    fn credit_state(&self, user_id: &str, course: &CourseKey) -> Option<CreditState>;
}
