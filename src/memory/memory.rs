//! The central [`Memory`] type and its ingestion-time request shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MemoryId;
use super::types::{Layer, MemoryType, Sublayer};

/// A stored unit of text plus enriched metadata — the atomic object of
/// retrieval (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: MemoryId,
    pub content: String,

    pub title: String,
    pub summary: String,
    /// Canonical, deduplicated, ≤5 concept labels.
    pub concepts: Vec<String>,
    /// Canonicalized, ≤12 short query patterns likely to trigger this memory.
    pub surfaces_when: Vec<String>,

    pub layer: Layer,
    pub sublayer: Sublayer,
    pub memory_type: MemoryType,
    /// `work`, `personal`, `project:<name>`, or `general`.
    pub domain: String,

    /// 1–10, rule-based from content and layer.
    pub importance: u8,
    /// 0.0–1.0, derived from importance + usage + freshness.
    pub authority_score: f64,

    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,

    /// Set when a newer memory has replaced this one.
    pub superseded_by_id: Option<MemoryId>,
    /// Ids of memories flagged as conflicting with this one (human review,
    /// never an auto-assertion of truth).
    pub potential_conflicts: Vec<MemoryId>,

    /// Soft-delete marker; archived memories are excluded from default
    /// searches but not physically removed.
    pub archived: bool,

    /// Caller-supplied fields not promoted to first-class columns:
    /// `category`, `intent`, `confidence`, `source`, `session_id`.
    pub custom: Option<serde_json::Value>,
}

impl Memory {
    /// Days elapsed since `created_at`, floored at zero.
    #[must_use]
    pub fn days_since_created(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds().max(0) as f64 / 86_400.0
    }

    /// Days elapsed since `last_accessed`, floored at zero.
    #[must_use]
    pub fn days_since_accessed(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_accessed).num_seconds().max(0) as f64 / 86_400.0
    }
}

/// Caller-supplied fields that are promoted to first-class [`Memory`]
/// columns or folded into `custom`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetadata {
    pub domain: Option<String>,
    pub category: Option<String>,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub source: Option<String>,
    pub session_id: Option<String>,
}

/// Input to [`crate::coordinator::WriteCoordinator::add_memory`].
#[derive(Debug, Clone, Default)]
pub struct AddMemoryRequest {
    pub content: String,
    pub memory_type: Option<MemoryType>,
    pub importance: Option<u8>,
    pub tags: Vec<String>,
    pub entities: Vec<super::entity::EntityRef>,
    pub metadata: MemoryMetadata,
}

impl AddMemoryRequest {
    /// Build a request from bare content, leaving everything else to be
    /// curated.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Outcome of a write-coordinator ingest (`spec.md` §6.1).
#[derive(Debug, Clone)]
pub enum AddMemoryOutcome {
    /// A genuinely new memory was created.
    Created(MemoryId),
    /// Content was byte-equal (after normalization) to an existing memory.
    Redundant(MemoryId),
    /// Content was near-duplicate (cosine ≥ 0.90) of an existing memory but
    /// differs — caller decides what to do.
    Contradictory { existing: MemoryId, similarity: f32 },
}
