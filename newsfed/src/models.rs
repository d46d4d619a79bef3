use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{NewsError, Result};

pub const MAX_HEADLINE_CHARS: usize = 64;
pub const MAX_DETAILS_CHARS: usize = 128;

/// Story category. The vocabulary is closed and shared by every agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Pol,
    Art,
    Tech,
    Trivia,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Pol, Category::Art, Category::Tech, Category::Trivia];

    /// Code used on the wire and on the command line
    pub fn code(self) -> &'static str {
        match self {
            Category::Pol => "pol",
            Category::Art => "art",
            Category::Tech => "tech",
            Category::Trivia => "trivia",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Pol => "Politics",
            Category::Art => "Art",
            Category::Tech => "Technology",
            Category::Trivia => "Trivia",
        }
    }
}

impl FromStr for Category {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| NewsError::InvalidValue { key: "category".into(), value: s.into() })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Story region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Uk,
    Eu,
    W,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Uk, Region::Eu, Region::W];

    pub fn code(self) -> &'static str {
        match self {
            Region::Uk => "uk",
            Region::Eu => "eu",
            Region::W => "w",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Uk => "UK",
            Region::Eu => "Europe",
            Region::W => "World",
        }
    }
}

impl FromStr for Region {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self> {
        Region::ALL
            .into_iter()
            .find(|r| r.code() == s)
            .ok_or_else(|| NewsError::InvalidValue { key: "region".into(), value: s.into() })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A news agency as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agency {
    pub code: String,
    pub name: String,
    /// Absolute base URL without a trailing slash
    pub base_url: String,
}

impl Agency {
    pub fn new(code: impl Into<String>, name: impl Into<String>, base_url: &str) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            base_url: normalize_base_url(base_url),
        }
    }

    /// Compose an endpoint below this agency, e.g. `endpoint("api/stories")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Directory record as served by the directory endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DirectoryRecord {
    pub agency_name: String,
    pub agency_code: String,
    pub url: String,
}

impl From<DirectoryRecord> for Agency {
    fn from(record: DirectoryRecord) -> Self {
        Agency::new(record.agency_code, record.agency_name, &record.url)
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// A story in canonical form, tagged with the agency that returned it.
///
/// `key` is only unique within its agency; nothing compares keys across agencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    pub agency_code: String,
    pub key: String,
    pub headline: String,
    pub category: Category,
    pub region: Region,
    pub author: String,
    pub date: NaiveDate,
    pub details: String,
}

/// Story record as an agency puts it on the wire.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireStory {
    pub key: serde_json::Value,
    pub headline: String,
    pub story_cat: String,
    pub story_region: String,
    pub author: String,
    pub story_date: String,
    pub story_details: String,
}

/// Body of the story-listing endpoint. A missing `stories` list means no stories.
#[derive(Debug, Deserialize)]
pub(crate) struct StoryList {
    #[serde(default)]
    pub stories: Option<Vec<WireStory>>,
}

/// Mapping rules, version 1:
/// - `key` may be a JSON string or number and is kept as an opaque string
/// - `author` is kept verbatim (agencies send either a username or a display name)
/// - `story_date` is `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp
/// - `story_cat` / `story_region` must be vocabulary codes
pub(crate) fn decode_story(agency_code: &str, wire: WireStory) -> Result<Story> {
    let key = match wire.key {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => return Err(NewsError::Malformed(format!("unsupported story key: {}", other))),
    };
    let category = wire
        .story_cat
        .parse::<Category>()
        .map_err(|_| NewsError::Malformed(format!("story {}: unknown category '{}'", key, wire.story_cat)))?;
    let region = wire
        .story_region
        .parse::<Region>()
        .map_err(|_| NewsError::Malformed(format!("story {}: unknown region '{}'", key, wire.story_region)))?;
    let date = parse_wire_date(&wire.story_date)
        .ok_or_else(|| NewsError::Malformed(format!("story {}: bad date '{}'", key, wire.story_date)))?;

    Ok(Story {
        agency_code: agency_code.to_string(),
        key,
        headline: wire.headline,
        category,
        region,
        author: wire.author,
        date,
        details: wire.story_details,
    })
}

fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Fields of a story about to be posted. The agency fills in author and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryDraft {
    pub headline: String,
    pub category: String,
    pub region: String,
    pub details: String,
}

impl StoryDraft {
    /// Local checks done before anything is sent.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("headline", &self.headline),
            ("category", &self.category),
            ("region", &self.region),
            ("details", &self.details),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(NewsError::Validation(format!("All fields are required ({} is empty)", name)));
        }
        if self.headline.chars().count() > MAX_HEADLINE_CHARS {
            return Err(NewsError::Validation(format!(
                "Headline must be {} characters or less",
                MAX_HEADLINE_CHARS
            )));
        }
        if self.details.chars().count() > MAX_DETAILS_CHARS {
            return Err(NewsError::Validation(format!(
                "Details must be {} characters or less",
                MAX_DETAILS_CHARS
            )));
        }
        if self.category.parse::<Category>().is_err() {
            return Err(NewsError::Validation(format!("Invalid category: {}", self.category)));
        }
        if self.region.parse::<Region>().is_err() {
            return Err(NewsError::Validation(format!("Invalid region: {}", self.region)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(value: serde_json::Value) -> WireStory {
        serde_json::from_value(value).expect("wire story")
    }

    fn draft(headline: &str) -> StoryDraft {
        StoryDraft {
            headline: headline.to_string(),
            category: "tech".into(),
            region: "uk".into(),
            details: "Some details".into(),
        }
    }

    #[test]
    fn agency_base_url_is_normalized() {
        let agency = Agency::new("A", "Agency A", "http://a.example/ ");
        assert_eq!(agency.base_url, "http://a.example");
        assert_eq!(agency.endpoint("api/stories"), "http://a.example/api/stories");
        assert_eq!(agency.endpoint("/api/login"), "http://a.example/api/login");
    }

    #[test]
    fn decodes_reference_agency_record() {
        let story = decode_story(
            "A",
            wire(json!({
                "key": "12",
                "headline": "Chip shortage eases",
                "story_cat": "tech",
                "story_region": "w",
                "author": "ammar",
                "story_date": "2024-03-05",
                "story_details": "Supply is back"
            })),
        )
        .expect("decode");

        assert_eq!(story.agency_code, "A");
        assert_eq!(story.key, "12");
        assert_eq!(story.category, Category::Tech);
        assert_eq!(story.region, Region::W);
        assert_eq!(story.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn decodes_numeric_key_and_alternate_dates() {
        let story = decode_story(
            "B",
            wire(json!({
                "key": 7,
                "headline": "h",
                "story_cat": "art",
                "story_region": "eu",
                "author": "Jane Doe",
                "story_date": "05/03/2024",
                "story_details": "d"
            })),
        )
        .expect("decode");
        assert_eq!(story.key, "7");
        assert_eq!(story.author, "Jane Doe");
        assert_eq!(story.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        assert_eq!(
            parse_wire_date("2024-03-05T10:11:12+00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn unknown_vocabulary_is_malformed() {
        let err = decode_story(
            "A",
            wire(json!({
                "key": "1",
                "headline": "h",
                "story_cat": "sports",
                "story_region": "uk",
                "author": "x",
                "story_date": "2024-01-01",
                "story_details": "d"
            })),
        )
        .unwrap_err();
        assert!(matches!(err, NewsError::Malformed(_)));
    }

    #[test]
    fn draft_validation() {
        assert!(draft("Fine headline").validate().is_ok());
        assert!(draft(&"x".repeat(64)).validate().is_ok());

        let err = draft(&"x".repeat(65)).validate().unwrap_err();
        assert!(matches!(err, NewsError::Validation(_)));

        let err = draft("   ").validate().unwrap_err();
        assert_eq!(err, NewsError::Validation("All fields are required (headline is empty)".into()));

        let mut bad = draft("ok");
        bad.category = "sports".into();
        assert!(matches!(bad.validate(), Err(NewsError::Validation(_))));

        let mut long = draft("ok");
        long.details = "d".repeat(129);
        assert!(matches!(long.validate(), Err(NewsError::Validation(_))));
    }

    #[test]
    fn vocabulary_round_trip() {
        for c in Category::ALL {
            assert_eq!(c.code().parse::<Category>().unwrap(), c);
        }
        for r in Region::ALL {
            assert_eq!(r.code().parse::<Region>().unwrap(), r);
        }
        assert!("UK".parse::<Region>().is_err());
    }
}
