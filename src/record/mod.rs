//! Bibliographic records and their extraction from detail responses
//!
//! Parsing happens in two steps: the XML reader fills an [`ArticleFields`]
//! value per article (every sub-field optional), then [`ArticleFields::into_record`]
//! maps it to a normalized [`Record`]. The mapping is pure, so the document
//! format can change without touching the extraction policy.

mod xml;

pub use xml::{parse_article_set, XmlError};

use serde::{Deserialize, Deserializer, Serialize};

/// A normalized bibliographic record as persisted in the checkpoint file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Author display names, in document order
    pub authors: Vec<String>,

    /// Publication date, possibly partial ("2020", "2020-Jan", "2020-01-15")
    pub pub_date: String,

    /// Primary database identifier
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pmid: String,
}

/// Accepts `null` for string fields written by older harvests
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One author entry as found in the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFields {
    pub fore_name: Option<String>,
    pub last_name: Option<String>,
}

/// Publication date sub-fields as found in the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubDateFields {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

/// Intermediate schema for one article; every sub-field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFields {
    pub pmid: Option<String>,
    pub title: Option<String>,
    pub abstract_segments: Vec<String>,
    pub authors: Vec<AuthorFields>,
    pub pub_date: PubDateFields,
}

impl ArticleFields {
    /// Maps the extracted fields to a [`Record`]
    ///
    /// Missing fields become empty strings. Authors whose combined name is
    /// empty are dropped rather than kept as empty entries.
    pub fn into_record(self) -> Record {
        let abstract_text = self
            .abstract_segments
            .iter()
            .map(String::as_str)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let authors = self
            .authors
            .iter()
            .filter_map(AuthorFields::display_name)
            .collect();

        Record {
            title: self.title.unwrap_or_default(),
            abstract_text,
            authors,
            pub_date: self.pub_date.normalized(),
            pmid: self.pmid.unwrap_or_default(),
        }
    }
}

impl AuthorFields {
    /// "ForeName LastName", or `None` when both parts are empty
    pub fn display_name(&self) -> Option<String> {
        let fore = self.fore_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        let name = format!("{} {}", fore, last).trim().to_string();

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

impl PubDateFields {
    /// Renders "year-month-day" and strips trailing separators
    pub fn normalized(&self) -> String {
        let raw = format!(
            "{}-{}-{}",
            self.year.as_deref().unwrap_or(""),
            self.month.as_deref().unwrap_or(""),
            self.day.as_deref().unwrap_or("")
        );
        normalize_pub_date(&raw)
    }
}

/// Trims whitespace, then trailing `-` separators, then whitespace again
///
/// ```
/// use pubmed_harvester::record::normalize_pub_date;
///
/// assert_eq!(normalize_pub_date("2020--"), "2020");
/// assert_eq!(normalize_pub_date("2020-Jan-"), "2020-Jan");
/// assert_eq!(normalize_pub_date("2020-01-15"), "2020-01-15");
/// ```
pub fn normalize_pub_date(raw: &str) -> String {
    raw.trim().trim_end_matches('-').trim().to_string()
}
