//! Repository records and the payloads that create or change them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier assigned by the store when a repository is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(Uuid);

impl RepositoryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an id taken from a request path.
    ///
    /// Only the exact text the store hands out is accepted; other spellings
    /// of the same UUID (uppercase, simple, braced, urn) return `None`, as
    /// does anything the store could never have issued.
    pub fn parse(raw: &str) -> Option<Self> {
        let uuid = Uuid::parse_str(raw).ok()?;
        let id = Self(uuid);
        (id.to_string() == raw).then_some(id)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A tracked project reference.
///
/// `title`, `url` and `techs` are optional because an update in overwrite mode
/// clears whatever the request body leaves out. Absent fields are omitted from
/// the JSON rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub techs: Option<Vec<String>>,
    pub likes: u64,
}

impl Repository {
    pub(crate) fn from_new(id: RepositoryId, new: NewRepository) -> Self {
        Self {
            id,
            title: Some(new.title),
            url: Some(new.url),
            techs: new.techs,
            likes: 0,
        }
    }
}

/// Validated body of a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub title: String,
    pub url: String,
    pub techs: Option<Vec<String>>,
}

/// Validated body of an update request.
///
/// `likes` is accepted so that clients echoing a full record are not rejected,
/// but the store never applies it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub techs: Option<Vec<String>>,
    pub likes: Option<f64>,
}
