//! Event-driven reader for `PubmedArticleSet` documents
//!
//! Fields are located by their element path relative to the enclosing
//! `PubmedArticle`, so identically named elements elsewhere in the document
//! (for example the `PMID` inside comment/correction lists) are not picked up.

use crate::record::{ArticleFields, AuthorFields};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while reading a detail response
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Malformed XML: {0}")]
    Malformed(String),

    #[error("Unexpected document: no PubmedArticleSet element")]
    UnexpectedRoot,
}

const ARTICLE_SET: &str = "PubmedArticleSet";
const ARTICLE: &str = "PubmedArticle";

const PMID_PATH: &[&str] = &["MedlineCitation", "PMID"];
const TITLE_PATH: &[&str] = &["MedlineCitation", "Article", "ArticleTitle"];
const ABSTRACT_TEXT_PATH: &[&str] = &["MedlineCitation", "Article", "Abstract", "AbstractText"];
const AUTHOR_PATH: &[&str] = &["MedlineCitation", "Article", "AuthorList", "Author"];
const PUB_DATE_PATH: &[&str] = &["MedlineCitation", "Article", "Journal", "JournalIssue", "PubDate"];

/// Leaf fields captured from the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pmid,
    Title,
    AbstractText,
    ForeName,
    LastName,
    Year,
    Month,
    Day,
}

/// Text being collected for a field, closed when the stack returns to `depth`
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Per-article parse state
struct ArticleState {
    /// Stack depth of the `PubmedArticle` element itself
    depth: usize,
    fields: ArticleFields,
    author: Option<AuthorFields>,
}

/// Parses a detail response into one [`ArticleFields`] per `PubmedArticle`
///
/// Text inside inline markup (`<i>`, `<sup>`, ...) is kept as part of the
/// enclosing field. Articles missing sub-fields are returned with those
/// fields unset; only a malformed document or a document that is not an
/// article set is an error.
pub fn parse_article_set(xml: &str) -> Result<Vec<ArticleFields>, XmlError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<String> = Vec::new();
    let mut articles = Vec::new();
    let mut seen_set = false;
    let mut article: Option<ArticleState> = None;
    let mut capture: Option<Capture> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(name);

                let name = stack.last().map(String::as_str).unwrap_or_default();
                if name == ARTICLE_SET {
                    seen_set = true;
                }

                if article.is_none() && name == ARTICLE {
                    article = Some(ArticleState {
                        depth: stack.len(),
                        fields: ArticleFields::default(),
                        author: None,
                    });
                    continue;
                }

                if let Some(state) = article.as_mut() {
                    let path = &stack[state.depth..];
                    if path == AUTHOR_PATH {
                        state.author = Some(AuthorFields::default());
                    } else if capture.is_none() {
                        if let Some(field) = field_for_path(path) {
                            capture = Some(Capture {
                                field,
                                depth: stack.len(),
                                text: String::new(),
                            });
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(capture) = capture.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| XmlError::Malformed(err.to_string()))?;
                    capture.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                if capture.as_ref().is_some_and(|c| c.depth == stack.len()) {
                    if let (Some(done), Some(state)) = (capture.take(), article.as_mut()) {
                        commit(state, done.field, done.text.trim());
                    }
                }

                let closes_article = article.as_ref().is_some_and(|s| s.depth == stack.len());
                if closes_article {
                    if let Some(state) = article.take() {
                        articles.push(state.fields);
                    }
                } else if let Some(state) = article.as_mut() {
                    if stack[state.depth..] == *AUTHOR_PATH {
                        if let Some(author) = state.author.take() {
                            state.fields.authors.push(author);
                        }
                    }
                }

                stack.pop();
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == ARTICLE_SET.as_bytes() {
                    seen_set = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XmlError::Malformed(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !seen_set {
        return Err(XmlError::UnexpectedRoot);
    }

    Ok(articles)
}

/// Maps an element path (relative to `PubmedArticle`) to the field it holds
fn field_for_path(path: &[String]) -> Option<Field> {
    let (leaf, parent) = path.split_last()?;

    if path == PMID_PATH {
        return Some(Field::Pmid);
    }
    if path == TITLE_PATH {
        return Some(Field::Title);
    }
    if path == ABSTRACT_TEXT_PATH {
        return Some(Field::AbstractText);
    }
    if parent == AUTHOR_PATH {
        return match leaf.as_str() {
            "ForeName" => Some(Field::ForeName),
            "LastName" => Some(Field::LastName),
            _ => None,
        };
    }
    if parent == PUB_DATE_PATH {
        return match leaf.as_str() {
            "Year" => Some(Field::Year),
            "Month" => Some(Field::Month),
            "Day" => Some(Field::Day),
            _ => None,
        };
    }

    None
}

/// Stores captured text in the article being parsed
fn commit(state: &mut ArticleState, field: Field, text: &str) {
    let value = text.to_string();
    let fields = &mut state.fields;

    match field {
        // First occurrence wins
        Field::Pmid => {
            fields.pmid.get_or_insert(value);
        }
        Field::Title => {
            fields.title.get_or_insert(value);
        }
        Field::AbstractText => {
            if !value.is_empty() {
                fields.abstract_segments.push(value);
            }
        }
        Field::ForeName => {
            if let Some(author) = state.author.as_mut() {
                author.fore_name = Some(value);
            }
        }
        Field::LastName => {
            if let Some(author) = state.author.as_mut() {
                author.last_name = Some(value);
            }
        }
        Field::Year => fields.pub_date.year = Some(value),
        Field::Month => fields.pub_date.month = Some(value),
        Field::Day => fields.pub_date.day = Some(value),
    }
}
