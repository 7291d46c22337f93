use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque position in a changes feed.
///
/// CouchDB 1.x reports plain integers, 2.x and later report strings. Anything
/// else the server sends is kept verbatim so it can be echoed back as `since`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seq {
    Number(u64),
    Text(String),
    Other(Value),
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seq::Number(n) => write!(f, "{n}"),
            Seq::Text(s) => f.write_str(s),
            Seq::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<u64> for Seq {
    fn from(value: u64) -> Self {
        Seq::Number(value)
    }
}

impl From<&str> for Seq {
    fn from(value: &str) -> Self {
        Seq::Text(value.to_string())
    }
}

impl From<String> for Seq {
    fn from(value: String) -> Self {
        Seq::Text(value)
    }
}

/// Integers become [`Seq::Number`], everything else [`Seq::Text`].
impl FromStr for Seq {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u64>() {
            Ok(n) => Seq::Number(n),
            Err(_) => Seq::Text(s.to_string()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub rev: String,
}

/// One record of the changes feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<Seq>,
    #[serde(default)]
    pub changes: Vec<Revision>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// Document body, present when the feed was opened with `include_docs=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Change {
    pub fn latest_rev(&self) -> Option<&str> {
        self.changes.first().map(|revision| revision.rev.as_str())
    }
}

/// Subset of a database's info document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    pub update_seq: Seq,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
