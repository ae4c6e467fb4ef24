//! Topic names
//!
//! A topic is a schema-qualified entity name such as `RDM:Student`. Data
//! tasks carry a topic identifying the business entity they affect; lifecycle
//! and sync tasks carry none.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Schema assumed when a topic string carries no qualifier.
pub const DEFAULT_SCHEMA: &str = "RDM";

/// A schema-qualified topic name
///
/// Equality is case-sensitive on the schema and case-insensitive on the
/// name, matching how the server matches topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    schema: String,
    name: String,
}

impl Topic {
    /// Creates a topic from its parts
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parses a string in the form `schema:name`
    ///
    /// A string without a colon delimiter is treated as a bare name in the
    /// [`DEFAULT_SCHEMA`] schema.
    pub fn parse(text: &str) -> Self {
        Self::parse_with_default(text, DEFAULT_SCHEMA)
    }

    /// Parses a string in the form `schema:name`, defaulting the schema to
    /// `default_schema` when no qualifier is present
    pub fn parse_with_default(text: &str, default_schema: &str) -> Self {
        match text.split_once(':') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::new(default_schema, text),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.name)
    }
}
