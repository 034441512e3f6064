//! # Elefante
//!
//! Local-first cognitive memory engine for conversational agents: a
//! curator that classifies and tags raw content (C4), a write
//! coordinator that deduplicates and persists it across a dual-store
//! substrate (C5), a six-signal hybrid retrieval engine (C6), a
//! constellation assembler that groups results around a primary memory
//! (C7), a health and conflict analyzer (C8), and a proactive surfacer
//! that nudges relevant memories into an ongoing conversation (C9).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use elefante::Elefante;
//! use elefante::config::Config;
//! use elefante::memory::AddMemoryRequest;
//!
//! # async fn run() -> elefante::error::Result<()> {
//! let home = elefante::config::home_dir();
//! let elefante = Elefante::open(&home, Config::default())?;
//!
//! let outcome = elefante.add_memory(AddMemoryRequest::new("User prefers tabs over spaces")).await?;
//! # Ok(())
//! # }
//! ```

pub mod coactivation;
pub mod config;
pub mod constellation;
pub mod coordinator;
pub mod curator;
pub mod elefante;
pub mod embeddings;
pub mod error;
pub mod health;
pub mod memory;
pub mod proactive;
pub mod retrieval;
pub mod storage;

pub use crate::elefante::{Elefante, Stats};
pub use error::{Error, Result};

/// Convenience re-exports for the common entry points. `use
/// elefante::prelude::*` pulls in the facade, the core memory types,
/// and the request/result types most callers construct directly.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::constellation::{Constellation, ConstellationMember, Role};
    pub use crate::elefante::{Elefante, Stats};
    pub use crate::error::{Error, Result};
    pub use crate::health::{Conflict, HealthReport};
    pub use crate::memory::{
        AddMemoryOutcome, AddMemoryRequest, Entity, EntityRef, EntityType, Memory, MemoryMetadata,
        MemoryType,
    };
    pub use crate::proactive::Suggestion;
    pub use crate::retrieval::{SearchFilters, SearchMode, SearchOptions, SearchResult};
}
