//! Classification enums shared by the curator, retrieval engine, and
//! health analyzer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level memory layer (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Facts about the user themselves (identity, preference, constraint).
    #[serde(rename = "self")]
    Myself,
    /// Facts about the world the user operates in.
    World,
    /// The user's goals and intentions.
    Intent,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layer::Myself => "self",
            Layer::World => "world",
            Layer::Intent => "intent",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(Layer::Myself),
            "world" => Ok(Layer::World),
            "intent" => Ok(Layer::Intent),
            other => Err(format!("unknown layer: {other}")),
        }
    }
}

/// Sublayer within a [`Layer`] (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sublayer {
    Identity,
    Preference,
    Constraint,
    Fact,
    Failure,
    Method,
    Rule,
    Goal,
    AntiPattern,
}

impl fmt::Display for Sublayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sublayer::Identity => "identity",
            Sublayer::Preference => "preference",
            Sublayer::Constraint => "constraint",
            Sublayer::Fact => "fact",
            Sublayer::Failure => "failure",
            Sublayer::Method => "method",
            Sublayer::Rule => "rule",
            Sublayer::Goal => "goal",
            Sublayer::AntiPattern => "anti-pattern",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Sublayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Sublayer::Identity),
            "preference" => Ok(Sublayer::Preference),
            "constraint" => Ok(Sublayer::Constraint),
            "fact" => Ok(Sublayer::Fact),
            "failure" => Ok(Sublayer::Failure),
            "method" => Ok(Sublayer::Method),
            "rule" => Ok(Sublayer::Rule),
            "goal" => Ok(Sublayer::Goal),
            "anti-pattern" => Ok(Sublayer::AntiPattern),
            other => Err(format!("unknown sublayer: {other}")),
        }
    }
}

/// Classification produced by [`crate::curator::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub layer: Layer,
    pub sublayer: Sublayer,
    pub importance: u8,
}

/// High-level kind of memory, independent of layer/sublayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    #[default]
    Fact,
    Rule,
    Preference,
    Decision,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryType::Fact => "fact",
            MemoryType::Rule => "rule",
            MemoryType::Preference => "preference",
            MemoryType::Decision => "decision",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fact" => Ok(MemoryType::Fact),
            "rule" => Ok(MemoryType::Rule),
            "preference" => Ok(MemoryType::Preference),
            "decision" => Ok(MemoryType::Decision),
            other => Err(format!("unknown memory type: {other}")),
        }
    }
}

/// Outcome of a health scan for a single memory (`spec.md` §4.5).
///
/// Priority-ordered: `AtRisk > Stale > Orphan > Healthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    AtRisk,
    Stale,
    Orphan,
    Healthy,
}

impl HealthStatus {
    /// A short icon for dashboard-style rendering, owned by the façade
    /// but cheap enough to compute here.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            HealthStatus::AtRisk => "⚠",
            HealthStatus::Stale => "◌",
            HealthStatus::Orphan => "∅",
            HealthStatus::Healthy => "●",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::AtRisk => "at_risk",
            HealthStatus::Stale => "stale",
            HealthStatus::Orphan => "orphan",
            HealthStatus::Healthy => "healthy",
        };
        write!(f, "{s}")
    }
}
