//! C2 — Semantic store: persists `{memory_id → (vector, content,
//! metadata)}` and serves k-NN with metadata filters (`spec.md` §4.7).
//! Adapted from the teacher's `storage::sqlite::Storage`: a writer/
//! reader connection pair over the same SQLite file, with an
//! in-process HNSW index mirroring the `embedding` column.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::embeddings::Embedding;
use crate::memory::{Layer, Memory, MemoryId, MemoryType, Sublayer};

use super::vector_index::VectorIndex;
use super::{Result, StorageError};

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// Normalize content for exact-duplicate detection: trim, collapse
/// whitespace, casefold, drop a single trailing sentence terminator.
/// Matches §8 scenario 2 (a trailing period alone must not create a
/// second memory).
#[must_use]
pub fn normalize_content(content: &str) -> String {
    let collapsed: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();
    lower.trim_end_matches(['.', '!', '?']).trim().to_string()
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let concepts_json: String = row.get("concepts")?;
    let surfaces_json: String = row.get("surfaces_when")?;
    let conflicts_json: String = row.get("potential_conflicts")?;
    let custom_json: Option<String> = row.get("custom")?;
    let layer_str: String = row.get("layer")?;
    let sublayer_str: String = row.get("sublayer")?;
    let memory_type_str: String = row.get("memory_type")?;
    let superseded_str: Option<String> = row.get("superseded_by_id")?;
    let id_str: String = row.get("id")?;
    let created_at: DateTime<Utc> = row.get("created_at")?;
    let last_accessed: DateTime<Utc> = row.get("last_accessed")?;

    let to_sql_err = |e: impl std::fmt::Display| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.to_string().into())
    };

    Ok(Memory {
        id: id_str.parse().map_err(|e: uuid::Error| to_sql_err(e))?,
        content: row.get("content")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        concepts: serde_json::from_str(&concepts_json).unwrap_or_default(),
        surfaces_when: serde_json::from_str(&surfaces_json).unwrap_or_default(),
        layer: layer_str.parse::<Layer>().map_err(to_sql_err)?,
        sublayer: sublayer_str.parse::<Sublayer>().map_err(to_sql_err)?,
        memory_type: memory_type_str.parse::<MemoryType>().map_err(to_sql_err)?,
        domain: row.get("domain")?,
        importance: row.get::<_, i64>("importance")? as u8,
        authority_score: row.get("authority_score")?,
        created_at,
        last_accessed,
        access_count: row.get::<_, i64>("access_count")? as u64,
        superseded_by_id: superseded_str.and_then(|s| s.parse().ok()),
        potential_conflicts: serde_json::from_str(&conflicts_json).unwrap_or_default(),
        archived: row.get::<_, i64>("archived")? != 0,
        custom: custom_json.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// SQLite + HNSW-backed semantic store.
pub struct SemanticStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    vector_index: Mutex<VectorIndex>,
}

impl SemanticStore {
    /// Open (creating if absent) the semantic store at `path`,
    /// applying migrations and rebuilding the in-memory vector index
    /// from persisted embeddings.
    pub fn open(path: &Path) -> Result<Self> {
        let writer_conn = Connection::open(path)?;
        configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(path)?;
        configure_connection(&reader_conn)?;

        let mut vector_index = VectorIndex::new().map_err(StorageError::VectorSearch)?;
        Self::load_index(&reader_conn, &mut vector_index)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            vector_index: Mutex::new(vector_index),
        })
    }

    /// In-memory store for tests: SQLite `:memory:`, empty index.
    pub fn open_in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;
        let reader_conn = Connection::open_in_memory()?;
        configure_connection(&reader_conn)?;
        super::migrations::apply_migrations(&reader_conn)?;
        let vector_index = VectorIndex::new().map_err(StorageError::VectorSearch)?;
        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            vector_index: Mutex::new(vector_index),
        })
    }

    fn load_index(conn: &Connection, index: &mut VectorIndex) -> Result<()> {
        let mut stmt = conn.prepare("SELECT id, embedding FROM memories WHERE embedding IS NOT NULL")?;
        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(std::result::Result::ok)
            .collect();
        for (id, bytes) in rows {
            if let Some(embedding) = bytes_to_vector(&bytes) {
                if let Err(e) = index.upsert(&id, &embedding) {
                    tracing::warn!(memory_id = %id, error = %e, "failed to load embedding into vector index");
                }
            }
        }
        Ok(())
    }

    /// Insert or overwrite a memory and its embedding.
    pub fn upsert(&self, memory: &Memory, embedding: &Embedding) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let concepts = serde_json::to_string(&memory.concepts)?;
        let surfaces = serde_json::to_string(&memory.surfaces_when)?;
        let conflicts = serde_json::to_string(&memory.potential_conflicts)?;
        let custom = memory.custom.as_ref().map(serde_json::to_string).transpose()?;
        let embedding_bytes = vector_to_bytes(&embedding.vector);

        conn.execute(
            "INSERT INTO memories (
                id, content, content_norm, title, summary, concepts, surfaces_when,
                layer, sublayer, memory_type, domain, importance, authority_score,
                created_at, last_accessed, access_count, superseded_by_id,
                potential_conflicts, archived, custom, embedding
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)
             ON CONFLICT(id) DO UPDATE SET
                content=excluded.content, content_norm=excluded.content_norm,
                title=excluded.title, summary=excluded.summary, concepts=excluded.concepts,
                surfaces_when=excluded.surfaces_when, layer=excluded.layer, sublayer=excluded.sublayer,
                memory_type=excluded.memory_type, domain=excluded.domain, importance=excluded.importance,
                authority_score=excluded.authority_score, last_accessed=excluded.last_accessed,
                access_count=excluded.access_count, superseded_by_id=excluded.superseded_by_id,
                potential_conflicts=excluded.potential_conflicts, archived=excluded.archived,
                custom=excluded.custom, embedding=excluded.embedding",
            params![
                memory.id.to_string(),
                memory.content,
                normalize_content(&memory.content),
                memory.title,
                memory.summary,
                concepts,
                surfaces,
                memory.layer.to_string(),
                memory.sublayer.to_string(),
                memory.memory_type.to_string(),
                memory.domain,
                memory.importance as i64,
                memory.authority_score,
                memory.created_at,
                memory.last_accessed,
                memory.access_count as i64,
                memory.superseded_by_id.map(|id| id.to_string()),
                conflicts,
                memory.archived as i64,
                custom,
                embedding_bytes,
            ],
        )?;

        let mut index = self.vector_index.lock().expect("vector index mutex poisoned");
        index.upsert(&memory.id.to_string(), &embedding.vector).map_err(StorageError::VectorSearch)?;

        Ok(())
    }

    pub fn get(&self, id: MemoryId) -> Result<Option<Memory>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row("SELECT * FROM memories WHERE id = ?1", params![id.to_string()], row_to_memory)
            .optional()
            .map_err(StorageError::from)
    }

    /// Find the id of an existing memory whose normalized content
    /// exactly matches `content` (§8 scenario 2, `REDUNDANT`).
    pub fn find_by_normalized_content(&self, content: &str) -> Result<Option<MemoryId>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let norm = normalize_content(content);
        let id: Option<String> = conn
            .query_row(
                "SELECT id FROM memories WHERE content_norm = ?1 AND archived = 0 LIMIT 1",
                params![norm],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.and_then(|s| s.parse().ok()))
    }

    pub fn delete(&self, id: MemoryId) -> Result<bool> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let affected = conn.execute("DELETE FROM memories WHERE id = ?1", params![id.to_string()])?;
        if affected > 0 {
            let mut index = self.vector_index.lock().expect("vector index mutex poisoned");
            index.remove(&id.to_string()).map_err(StorageError::VectorSearch)?;
        }
        Ok(affected > 0)
    }

    /// k-NN search over the embedding index, joined back to full
    /// `Memory` rows.
    pub fn knn(&self, query: &[f32], limit: usize) -> Result<Vec<(Memory, f32)>> {
        let hits = {
            let index = self.vector_index.lock().expect("vector index mutex poisoned");
            index.search(query, limit).map_err(StorageError::VectorSearch)?
        };

        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut out = Vec::with_capacity(hits.len());
        for (id_str, similarity) in hits {
            if let Some(memory) = conn
                .query_row("SELECT * FROM memories WHERE id = ?1", params![id_str], row_to_memory)
                .optional()?
            {
                out.push((memory, similarity));
            }
        }
        Ok(out)
    }

    /// Record an access: bump `access_count`, set `last_accessed`.
    pub fn touch_access(&self, id: MemoryId, now: DateTime<Utc>) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1, last_accessed = ?2 WHERE id = ?1",
            params![id.to_string(), now],
        )?;
        Ok(())
    }

    /// Overwrite `authority_score` (e.g. after a curator recompute).
    pub fn update_authority(&self, id: MemoryId, authority_score: f64) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "UPDATE memories SET authority_score = ?2 WHERE id = ?1",
            params![id.to_string(), authority_score],
        )?;
        Ok(())
    }

    /// Append `conflict_id` to a memory's `potential_conflicts`, deduped.
    pub fn add_conflict(&self, id: MemoryId, conflict_id: MemoryId) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let existing: String =
            conn.query_row("SELECT potential_conflicts FROM memories WHERE id = ?1", params![id.to_string()], |r| r.get(0))?;
        let mut ids: Vec<MemoryId> = serde_json::from_str(&existing).unwrap_or_default();
        if !ids.contains(&conflict_id) {
            ids.push(conflict_id);
        }
        let updated = serde_json::to_string(&ids)?;
        conn.execute(
            "UPDATE memories SET potential_conflicts = ?2 WHERE id = ?1",
            params![id.to_string(), updated],
        )?;
        Ok(())
    }

    /// All non-archived memories, for health scans and proactive
    /// surfacing (both need a full corpus pass).
    pub fn list_active(&self) -> Result<Vec<Memory>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT * FROM memories WHERE archived = 0")?;
        let rows = stmt.query_map([], row_to_memory)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Stored embedding for a memory, if present, for dedup/conflict
    /// similarity comparisons.
    pub fn get_embedding(&self, id: MemoryId) -> Result<Option<Vec<f32>>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let bytes: Option<Vec<u8>> = conn
            .query_row("SELECT embedding FROM memories WHERE id = ?1", params![id.to_string()], |r| r.get(0))
            .optional()?
            .flatten();
        Ok(bytes.and_then(|b| bytes_to_vector(&b)))
    }
}

fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_memory() -> Memory {
        let now = Utc::now();
        Memory {
            id: MemoryId::new(),
            content: "NEVER commit secrets to the repository".to_string(),
            title: "intent.rule: secrets".to_string(),
            summary: "Never commit secrets".to_string(),
            concepts: vec!["secrets".to_string(), "repository".to_string()],
            surfaces_when: vec!["secrets".to_string()],
            layer: Layer::Intent,
            sublayer: Sublayer::Rule,
            memory_type: MemoryType::Rule,
            domain: "general".to_string(),
            importance: 9,
            authority_score: 0.8,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            superseded_by_id: None,
            potential_conflicts: Vec::new(),
            archived: false,
            custom: None,
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let store = SemanticStore::open_in_memory().unwrap();
        let memory = sample_memory();
        let embedding = Embedding::new(vec![0.1; crate::embeddings::EMBEDDING_DIMENSIONS]);
        store.upsert(&memory, &embedding).unwrap();

        let fetched = store.get(memory.id).unwrap().unwrap();
        assert_eq!(fetched.content, memory.content);
        assert_eq!(fetched.concepts, memory.concepts);
    }

    #[test]
    fn normalized_content_matches_trailing_punctuation_variant() {
        assert_eq!(
            normalize_content("User prefers 4 spaces for Python indentation"),
            normalize_content("User prefers 4 spaces for Python indentation."),
        );
    }

    #[test]
    fn find_by_normalized_content_detects_redundancy() {
        let store = SemanticStore::open_in_memory().unwrap();
        let mut memory = sample_memory();
        memory.content = "User prefers 4 spaces for Python indentation".to_string();
        let embedding = Embedding::new(vec![0.2; crate::embeddings::EMBEDDING_DIMENSIONS]);
        store.upsert(&memory, &embedding).unwrap();

        let found = store
            .find_by_normalized_content("User prefers 4 spaces for Python indentation.")
            .unwrap();
        assert_eq!(found, Some(memory.id));
    }

    #[test]
    fn knn_returns_closest_first() {
        let store = SemanticStore::open_in_memory().unwrap();
        let mut a = sample_memory();
        a.content = "a".to_string();
        let mut b = sample_memory();
        b.content = "b".to_string();

        let mut va = vec![1.0_f32; crate::embeddings::EMBEDDING_DIMENSIONS];
        va[0] = 2.0;
        let mut vb = vec![-1.0_f32; crate::embeddings::EMBEDDING_DIMENSIONS];
        vb[0] = -2.0;

        store.upsert(&a, &Embedding::new(va.clone())).unwrap();
        store.upsert(&b, &Embedding::new(vb)).unwrap();

        let results = store.knn(&va, 2).unwrap();
        assert_eq!(results[0].0.id, a.id);
    }

    #[test]
    fn delete_removes_row_and_index_entry() {
        let store = SemanticStore::open_in_memory().unwrap();
        let memory = sample_memory();
        store.upsert(&memory, &Embedding::new(vec![0.0; crate::embeddings::EMBEDDING_DIMENSIONS])).unwrap();
        assert!(store.delete(memory.id).unwrap());
        assert!(store.get(memory.id).unwrap().is_none());
    }

    #[test]
    fn touch_access_bumps_count() {
        let store = SemanticStore::open_in_memory().unwrap();
        let memory = sample_memory();
        store.upsert(&memory, &Embedding::new(vec![0.0; crate::embeddings::EMBEDDING_DIMENSIONS])).unwrap();
        store.touch_access(memory.id, Utc::now()).unwrap();
        let fetched = store.get(memory.id).unwrap().unwrap();
        assert_eq!(fetched.access_count, 1);
    }
}
