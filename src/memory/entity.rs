//! Structured-store types: entities and the typed relationships between
//! them (`spec.md` §3). Grounded on `zircote-subcog`'s
//! `models::graph::{Entity, Relationship}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{EntityId, RelationshipId};

/// A proper noun / concept node in the structured store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Technology,
    Concept,
    Project,
    Location,
    Organization,
    Other(String),
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Person => write!(f, "person"),
            EntityType::Technology => write!(f, "technology"),
            EntityType::Concept => write!(f, "concept"),
            EntityType::Project => write!(f, "project"),
            EntityType::Location => write!(f, "location"),
            EntityType::Organization => write!(f, "organization"),
            EntityType::Other(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "person" => EntityType::Person,
            "technology" => EntityType::Technology,
            "concept" => EntityType::Concept,
            "project" => EntityType::Project,
            "location" => EntityType::Location,
            "organization" => EntityType::Organization,
            other => EntityType::Other(other.to_string()),
        })
    }
}

/// An entity node in the structured store.
///
/// Uniqueness invariant: a second write with the same
/// `(normalized name, type)` must return the existing id — enforced by
/// [`crate::storage::graph::StructuredStore::upsert_entity`], not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub entity_type: EntityType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub properties: serde_json::Value,
}

/// A reference to an entity supplied by a caller at ingest time, before
/// it has been resolved to a stable [`EntityId`].
#[derive(Debug, Clone)]
pub struct EntityRef {
    pub name: String,
    pub entity_type: EntityType,
    pub properties: serde_json::Value,
}

impl EntityRef {
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            properties: serde_json::Value::Null,
        }
    }
}

/// Directed, typed edge between entities with a strength in `(0,1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub from_id: EntityId,
    pub to_id: EntityId,
    pub relationship_type: String,
    pub strength: f32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trips_known_variants() {
        for s in ["person", "technology", "concept", "project", "location", "organization"] {
            let parsed: EntityType = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn entity_type_preserves_unknown_variants() {
        let parsed: EntityType = "gadget".parse().unwrap();
        assert_eq!(parsed.to_string(), "gadget");
    }
}
