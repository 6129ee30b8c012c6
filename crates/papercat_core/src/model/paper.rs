//! Paper domain model.
//!
//! # Responsibility
//! - Define the bibliographic record imported from Mendeley or entered by hand.
//! - Own field-level validation shared by write paths and deserialization.
//!
//! # Invariants
//! - `id` is never nil.
//! - `title` is non-blank and at most 500 characters.
//! - `mendeley_id`, when present, is non-empty and at most 255 characters.
//! - `abstract_text == ""` means enrichment is pending and
//!   `abstract_text == NO_ABSTRACT` means enrichment found nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable row identifier for a paper.
pub type PaperId = Uuid;

/// Abstract value recorded when enrichment ran and found no abstract.
pub const NO_ABSTRACT: &str = "No abstract.";

pub const TITLE_MAX_CHARS: usize = 500;
pub const MENDELEY_ID_MAX_CHARS: usize = 255;
pub const SHORT_FIELD_MAX_CHARS: usize = 300;
pub const LONG_FIELD_MAX_CHARS: usize = 500;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?|ftps?)://[^\s/?#]+[^\s]*$").expect("valid url regex")
});

/// Enrichment state derived from the abstract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbstractState {
    /// Abstract not fetched yet.
    Pending,
    /// Enrichment completed and the source has no abstract.
    Missing,
    /// A real abstract is stored.
    Present,
}

/// Validation failures for paper records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperValidationError {
    NilId,
    BlankTitle,
    EmptyMendeleyId,
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    InvalidUrl {
        field: &'static str,
        value: String,
    },
}

impl Display for PaperValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "paper id must not be nil"),
            Self::BlankTitle => write!(f, "paper title must not be blank"),
            Self::EmptyMendeleyId => {
                write!(f, "mendeley_id must be absent or non-empty")
            }
            Self::FieldTooLong { field, max, actual } => {
                write!(f, "{field} is {actual} characters long, max is {max}")
            }
            Self::InvalidUrl { field, value } => {
                write!(f, "{field} is not an http(s) url: `{value}`")
            }
        }
    }
}

impl Error for PaperValidationError {}

/// Canonical catalog record for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaperWire")]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    /// `None` for papers that did not come from Mendeley.
    pub mendeley_id: Option<String>,
    pub year: Option<u32>,
    /// Serialized as `abstract` (reserved word in Rust).
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub publication_outlet: String,
    pub doi: String,
    pub mendeley_url: String,
    /// Category labels as delivered by Mendeley, kept verbatim.
    pub categories: String,
    /// DOI / ISSN / PMID blob.
    pub identifiers: String,
    pub issue: String,
    pub pages: String,
    pub stats: String,
    pub paper_type: String,
    pub volume: String,
    pub public_file_hash: String,
    pub paper_topic: String,
    pub keywords: String,
}

/// Unvalidated mirror of `Paper` used as the serde entry point.
#[derive(Deserialize)]
struct PaperWire {
    id: PaperId,
    title: String,
    #[serde(default)]
    mendeley_id: Option<String>,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
    #[serde(default)]
    publication_outlet: String,
    #[serde(default)]
    doi: String,
    #[serde(default)]
    mendeley_url: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    identifiers: String,
    #[serde(default)]
    issue: String,
    #[serde(default)]
    pages: String,
    #[serde(default)]
    stats: String,
    #[serde(default)]
    paper_type: String,
    #[serde(default)]
    volume: String,
    #[serde(default)]
    public_file_hash: String,
    #[serde(default)]
    paper_topic: String,
    #[serde(default)]
    keywords: String,
}

impl TryFrom<PaperWire> for Paper {
    type Error = PaperValidationError;

    fn try_from(wire: PaperWire) -> Result<Self, Self::Error> {
        let paper = Paper {
            id: wire.id,
            title: wire.title,
            mendeley_id: wire.mendeley_id,
            year: wire.year,
            abstract_text: wire.abstract_text,
            publication_outlet: wire.publication_outlet,
            doi: wire.doi,
            mendeley_url: wire.mendeley_url,
            categories: wire.categories,
            identifiers: wire.identifiers,
            issue: wire.issue,
            pages: wire.pages,
            stats: wire.stats,
            paper_type: wire.paper_type,
            volume: wire.volume,
            public_file_hash: wire.public_file_hash,
            paper_topic: wire.paper_topic,
            keywords: wire.keywords,
        };
        paper.validate()?;
        Ok(paper)
    }
}

impl Paper {
    /// Creates a paper with a generated id and every optional field empty.
    ///
    /// The abstract starts empty, so a new paper is pending enrichment.
    pub fn new(title: impl Into<String>) -> Self {
        Self::blank(Uuid::new_v4(), title.into())
    }

    /// Creates a paper with a caller-provided id.
    ///
    /// # Errors
    /// - `NilId` when `id` is the nil UUID.
    pub fn with_id(id: PaperId, title: impl Into<String>) -> Result<Self, PaperValidationError> {
        if id.is_nil() {
            return Err(PaperValidationError::NilId);
        }
        Ok(Self::blank(id, title.into()))
    }

    fn blank(id: PaperId, title: String) -> Self {
        Self {
            id,
            title,
            mendeley_id: None,
            year: None,
            abstract_text: String::new(),
            publication_outlet: String::new(),
            doi: String::new(),
            mendeley_url: String::new(),
            categories: String::new(),
            identifiers: String::new(),
            issue: String::new(),
            pages: String::new(),
            stats: String::new(),
            paper_type: String::new(),
            volume: String::new(),
            public_file_hash: String::new(),
            paper_topic: String::new(),
            keywords: String::new(),
        }
    }

    /// Builder-style setter for the Mendeley id.
    pub fn with_mendeley_id(mut self, mendeley_id: impl Into<String>) -> Self {
        self.mendeley_id = Some(mendeley_id.into());
        self
    }

    /// Builder-style setter for the abstract.
    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = abstract_text.into();
        self
    }

    /// Title immediately followed by the abstract, without a separator.
    pub fn description(&self) -> String {
        let mut description =
            String::with_capacity(self.title.len() + self.abstract_text.len());
        description.push_str(&self.title);
        description.push_str(&self.abstract_text);
        description
    }

    pub fn abstract_state(&self) -> AbstractState {
        match self.abstract_text.as_str() {
            "" => AbstractState::Pending,
            NO_ABSTRACT => AbstractState::Missing,
            _ => AbstractState::Present,
        }
    }

    /// Checks every field rule enforced before persistence.
    ///
    /// # Errors
    /// Returns the first violated rule, checked in declaration order.
    pub fn validate(&self) -> Result<(), PaperValidationError> {
        if self.id.is_nil() {
            return Err(PaperValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(PaperValidationError::BlankTitle);
        }
        check_len("title", &self.title, TITLE_MAX_CHARS)?;

        if let Some(mendeley_id) = self.mendeley_id.as_deref() {
            if mendeley_id.is_empty() {
                return Err(PaperValidationError::EmptyMendeleyId);
            }
            check_len("mendeley_id", mendeley_id, MENDELEY_ID_MAX_CHARS)?;
        }

        let short_fields = [
            ("publication_outlet", &self.publication_outlet),
            ("doi", &self.doi),
            ("mendeley_url", &self.mendeley_url),
            ("categories", &self.categories),
            ("identifiers", &self.identifiers),
            ("issue", &self.issue),
            ("pages", &self.pages),
            ("stats", &self.stats),
            ("paper_type", &self.paper_type),
            ("volume", &self.volume),
            ("public_file_hash", &self.public_file_hash),
        ];
        for (field, value) in short_fields {
            check_len(field, value, SHORT_FIELD_MAX_CHARS)?;
        }
        check_len("paper_topic", &self.paper_topic, LONG_FIELD_MAX_CHARS)?;
        check_len("keywords", &self.keywords, LONG_FIELD_MAX_CHARS)?;

        if !self.mendeley_url.is_empty() && !URL_RE.is_match(&self.mendeley_url) {
            return Err(PaperValidationError::InvalidUrl {
                field: "mendeley_url",
                value: self.mendeley_url.clone(),
            });
        }

        Ok(())
    }
}

impl Display for Paper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), PaperValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(PaperValidationError::FieldTooLong { field, max, actual });
    }
    Ok(())
}
