use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Placeholder for an absent studio or start date.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder for a title the detail API does not rank.
pub const UNRANKED: &str = "Unranked";

/// One page of the list API: `{ data: [...], paging: { next } }`.
///
/// Entries stay raw so one odd entry cannot fail the whole page.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub node: ListNode,
    #[serde(default)]
    pub list_status: ListStatus,
}

impl ListEntry {
    pub fn entity_id(&self) -> u64 {
        self.node.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListNode {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The user's own bookkeeping for a title, exactly as the list API returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_episodes_watched: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    pub data: DetailData,
}

/// The subset of the detail API payload the pipeline reads.
///
/// The category arrays are required: a payload without them is malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailData {
    pub title: String,
    pub score: Option<f64>,
    pub genres: Vec<NamedEntry>,
    pub themes: Vec<NamedEntry>,
    pub demographics: Vec<NamedEntry>,
    pub studios: Vec<NamedEntry>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl WatchStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "watching" => Some(Self::Watching),
            "completed" => Some(Self::Completed),
            "on_hold" => Some(Self::OnHold),
            "dropped" => Some(Self::Dropped),
            "plan_to_watch" => Some(Self::PlanToWatch),
            _ => None,
        }
    }
}

/// Global rank, serialized as a number or `"Unranked"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Ranked(u32),
    Unranked,
}

/// Popularity position (1 = most popular), serialized as a number or `"Unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popularity {
    Known(u32),
    Unknown,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrSentinel {
    Number(u32),
    Sentinel(String),
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ranked(rank) => serializer.serialize_u32(*rank),
            Self::Unranked => serializer.serialize_str(UNRANKED),
        }
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NumberOrSentinel::deserialize(deserializer)? {
            NumberOrSentinel::Number(rank) => Ok(Self::Ranked(rank)),
            NumberOrSentinel::Sentinel(s) if s == UNRANKED => Ok(Self::Unranked),
            NumberOrSentinel::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "expected rank number or {UNRANKED:?}, got {s:?}"
            ))),
        }
    }
}

impl Serialize for Popularity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(popularity) => serializer.serialize_u32(*popularity),
            Self::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for Popularity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NumberOrSentinel::deserialize(deserializer)? {
            NumberOrSentinel::Number(popularity) => Ok(Self::Known(popularity)),
            NumberOrSentinel::Sentinel(s) if s == UNKNOWN => Ok(Self::Unknown),
            NumberOrSentinel::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "expected popularity number or {UNKNOWN:?}, got {s:?}"
            ))),
        }
    }
}

/// A list entry joined with its detail payload.
///
/// `title` is always non-empty and comes from the detail API. `score` is the
/// user's own score; `rating` is the detail API's global score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub entity_id: u64,
    pub title: String,
    pub score: Option<u8>,
    pub status: WatchStatus,
    pub start_date: String,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub demographics: Vec<String>,
    pub studio: String,
    pub rating: Option<f64>,
    pub rank: Rank,
    pub popularity: Popularity,
    pub episodes_watched: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRatingPoint {
    pub title: String,
    pub my_score: u8,
    pub overall_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub entity_id: u64,
    pub error: String,
}
