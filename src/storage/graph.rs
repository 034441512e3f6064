//! C3 — Structured store: entities and typed relationships, with a
//! small fixed pattern-query language (`spec.md` §4.7; pattern set
//! resolved in `SPEC_FULL.md` §4.7). Entity/relationship modeling is
//! grounded on `zircote-subcog`'s `models::graph`; `create_or_get`
//! semantics follow `original_source/src/core/graph_store.py`.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::curator::canonicalize_label;
use crate::memory::{Entity, EntityId, EntityRef, EntityType, MemoryId, Relationship, RelationshipId};

use super::{Result, StorageError};

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
    Ok(())
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    let id_str: String = row.get("id")?;
    let type_str: String = row.get("entity_type")?;
    let properties_json: String = row.get("properties")?;
    let to_sql_err = |e: std::convert::Infallible| -> rusqlite::Error {
        match e {}
    };
    Ok(Entity {
        id: id_str.parse().map_err(|e: uuid::Error| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.to_string().into())
        })?,
        name: row.get("name")?,
        entity_type: type_str.parse::<EntityType>().map_err(to_sql_err)?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        properties: serde_json::from_str(&properties_json).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relationship> {
    let id_str: String = row.get("id")?;
    let from_str: String = row.get("from_id")?;
    let to_str: String = row.get("to_id")?;
    let parse_err = |e: uuid::Error| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.to_string().into())
    };
    Ok(Relationship {
        id: id_str.parse().map_err(parse_err)?,
        from_id: from_str.parse().map_err(parse_err)?,
        to_id: to_str.parse().map_err(parse_err)?,
        relationship_type: row.get("relationship_type")?,
        strength: row.get("strength")?,
        created_at: row.get("created_at")?,
    })
}

/// One row returned by [`StructuredStore::run_pattern`]. Shaped
/// loosely (not a strict schema) since each named pattern returns a
/// different column set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatternRow(pub serde_json::Value);

/// SQLite-backed entity/relationship graph. Single-writer per process
/// (`spec.md` §5): `upsert_entity`, `upsert_edge`, and `delete_entity`
/// all take the write mutex.
pub struct StructuredStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl StructuredStore {
    pub fn open(path: &Path) -> Result<Self> {
        let writer_conn = Connection::open(path)?;
        configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;
        let reader_conn = Connection::open(path)?;
        configure_connection(&reader_conn)?;
        Ok(Self { writer: Mutex::new(writer_conn), reader: Mutex::new(reader_conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;
        let reader_conn = Connection::open_in_memory()?;
        configure_connection(&reader_conn)?;
        super::migrations::apply_migrations(&reader_conn)?;
        Ok(Self { writer: Mutex::new(writer_conn), reader: Mutex::new(reader_conn) })
    }

    /// Create an entity, or return the id of an existing one with the
    /// same `(normalized name, type)` — entity uniqueness invariant
    /// (`spec.md` §8).
    pub fn upsert_entity(&self, entity_ref: &EntityRef) -> Result<EntityId> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let normalized = canonicalize_label(&entity_ref.name);
        let type_str = entity_ref.entity_type.to_string();

        if let Some(existing) = conn
            .query_row(
                "SELECT id FROM entities WHERE normalized_name = ?1 AND entity_type = ?2",
                params![normalized, type_str],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        {
            return existing
                .parse()
                .map_err(|e: uuid::Error| StorageError::Init(format!("corrupt entity id: {e}")));
        }

        let id = EntityId::new();
        let properties = serde_json::to_string(&entity_ref.properties)?;
        conn.execute(
            "INSERT INTO entities (id, name, normalized_name, entity_type, description, created_at, properties)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
            params![id.to_string(), entity_ref.name, normalized, type_str, Utc::now(), properties],
        )?;
        Ok(id)
    }

    pub fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        conn.query_row("SELECT * FROM entities WHERE id = ?1", params![id.to_string()], row_to_entity)
            .optional()
            .map_err(StorageError::from)
    }

    /// Create a directed, typed edge between two entities.
    pub fn upsert_edge(
        &self,
        from_id: EntityId,
        to_id: EntityId,
        relationship_type: &str,
        strength: f32,
    ) -> Result<RelationshipId> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        let id = RelationshipId::new();
        conn.execute(
            "INSERT INTO relationships (id, from_id, to_id, relationship_type, strength, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id.to_string(), from_id.to_string(), to_id.to_string(), relationship_type, strength, Utc::now()],
        )?;
        Ok(id)
    }

    /// Link a memory to an entity it mentions.
    pub fn link_memory_entity(&self, memory_id: MemoryId, entity_id: EntityId) -> Result<()> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO memory_entities (memory_id, entity_id) VALUES (?1, ?2)",
            params![memory_id.to_string(), entity_id.to_string()],
        )?;
        Ok(())
    }

    pub fn delete_entity(&self, id: EntityId) -> Result<bool> {
        let conn = self.writer.lock().expect("writer mutex poisoned");
        conn.execute("DELETE FROM relationships WHERE from_id = ?1 OR to_id = ?1", params![id.to_string()])?;
        conn.execute("DELETE FROM memory_entities WHERE entity_id = ?1", params![id.to_string()])?;
        let affected = conn.execute("DELETE FROM entities WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// Entities linked to `memory_id`, used to gather graph-neighborhood
    /// retrieval candidates (`spec.md` §2 query data flow).
    pub fn entities_for_memory(&self, memory_id: MemoryId) -> Result<Vec<Entity>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT e.* FROM entities e
             JOIN memory_entities me ON me.entity_id = e.id
             WHERE me.memory_id = ?1",
        )?;
        let rows = stmt.query_map(params![memory_id.to_string()], row_to_entity)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
    }

    /// Memory ids linked to any entity also linked to `memory_id` —
    /// the graph-neighborhood candidate set for retrieval.
    pub fn neighboring_memories(&self, memory_id: MemoryId) -> Result<Vec<MemoryId>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT DISTINCT me2.memory_id FROM memory_entities me1
             JOIN memory_entities me2 ON me2.entity_id = me1.entity_id
             WHERE me1.memory_id = ?1 AND me2.memory_id != ?1",
        )?;
        let ids: Vec<String> = stmt.query_map(params![memory_id.to_string()], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
        Ok(ids.into_iter().filter_map(|s| s.parse().ok()).collect())
    }

    /// Run one of the three named graph patterns (`SPEC_FULL.md` §4.7):
    /// `"neighbors_of"` (entity id → connected entities), `"entities_by_type"`
    /// (entity type → entities), `"memories_for_entity"` (entity id →
    /// memory ids).
    pub fn run_pattern(&self, pattern: &str, params_map: &serde_json::Value) -> Result<Vec<PatternRow>> {
        match pattern {
            "neighbors_of" => {
                let entity_id = params_map["entity_id"]
                    .as_str()
                    .ok_or_else(|| StorageError::Init("neighbors_of requires entity_id".into()))?;
                let conn = self.reader.lock().expect("reader mutex poisoned");
                let mut stmt = conn.prepare(
                    "SELECT e.*, r.relationship_type, r.strength FROM relationships r
                     JOIN entities e ON e.id = CASE WHEN r.from_id = ?1 THEN r.to_id ELSE r.from_id END
                     WHERE r.from_id = ?1 OR r.to_id = ?1",
                )?;
                let rows = stmt.query_map(params![entity_id], |row| {
                    let entity = row_to_entity(row)?;
                    let relationship_type: String = row.get("relationship_type")?;
                    let strength: f32 = row.get("strength")?;
                    Ok(PatternRow(serde_json::json!({
                        "entity": entity,
                        "relationship_type": relationship_type,
                        "strength": strength,
                    })))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
            }
            "entities_by_type" => {
                let entity_type = params_map["entity_type"]
                    .as_str()
                    .ok_or_else(|| StorageError::Init("entities_by_type requires entity_type".into()))?;
                let conn = self.reader.lock().expect("reader mutex poisoned");
                let mut stmt = conn.prepare("SELECT * FROM entities WHERE entity_type = ?1")?;
                let rows = stmt.query_map(params![entity_type], |row| {
                    Ok(PatternRow(serde_json::to_value(row_to_entity(row)?).unwrap_or(serde_json::Value::Null)))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
            }
            "memories_for_entity" => {
                let entity_id = params_map["entity_id"]
                    .as_str()
                    .ok_or_else(|| StorageError::Init("memories_for_entity requires entity_id".into()))?;
                let conn = self.reader.lock().expect("reader mutex poisoned");
                let mut stmt = conn.prepare("SELECT memory_id FROM memory_entities WHERE entity_id = ?1")?;
                let rows = stmt.query_map(params![entity_id], |row| {
                    let memory_id: String = row.get(0)?;
                    Ok(PatternRow(serde_json::json!({ "memory_id": memory_id })))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
            }
            other => Err(StorageError::Init(format!("unknown graph pattern: {other}"))),
        }
    }

    /// Entities whose normalized name matches, across all types — used
    /// by retrieval's concept-keyed graph-neighborhood expansion
    /// (`spec.md` §4.3 step 2).
    pub fn entities_by_normalized_name(&self, normalized_name: &str) -> Result<Vec<Entity>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT * FROM entities WHERE normalized_name = ?1")?;
        let rows = stmt.query_map(params![normalized_name], row_to_entity)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
    }

    /// Memory ids linked to `entity_id`.
    pub fn memory_ids_for_entity(&self, entity_id: EntityId) -> Result<Vec<MemoryId>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT memory_id FROM memory_entities WHERE entity_id = ?1")?;
        let ids: Vec<String> = stmt.query_map(params![entity_id.to_string()], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
        Ok(ids.into_iter().filter_map(|s| s.parse().ok()).collect())
    }

    /// All relationships touching `entity_id`, either direction.
    pub fn relationships_of(&self, entity_id: EntityId) -> Result<Vec<Relationship>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT * FROM relationships WHERE from_id = ?1 OR to_id = ?1")?;
        let rows = stmt.query_map(params![entity_id.to_string()], row_to_relationship)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StorageError::from)
    }

    pub fn entity_count(&self) -> Result<usize> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entities", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn relationship_count(&self) -> Result<usize> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_entity_is_idempotent_by_normalized_name_and_type() {
        let store = StructuredStore::open_in_memory().unwrap();
        let a = store.upsert_entity(&EntityRef::new("Python", EntityType::Technology)).unwrap();
        let b = store.upsert_entity(&EntityRef::new("python", EntityType::Technology)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn same_name_different_type_yields_distinct_ids() {
        let store = StructuredStore::open_in_memory().unwrap();
        let language = store.upsert_entity(&EntityRef::new("Python", EntityType::Concept)).unwrap();
        let technology = store.upsert_entity(&EntityRef::new("Python", EntityType::Technology)).unwrap();
        assert_ne!(language, technology);
    }

    #[test]
    fn neighboring_memories_via_shared_entity() {
        let store = StructuredStore::open_in_memory().unwrap();
        let entity = store.upsert_entity(&EntityRef::new("Rust", EntityType::Technology)).unwrap();
        let mem_a = MemoryId::new();
        let mem_b = MemoryId::new();
        store.link_memory_entity(mem_a, entity).unwrap();
        store.link_memory_entity(mem_b, entity).unwrap();

        let neighbors = store.neighboring_memories(mem_a).unwrap();
        assert_eq!(neighbors, vec![mem_b]);
    }

    #[test]
    fn delete_entity_cascades_relationships_and_links() {
        let store = StructuredStore::open_in_memory().unwrap();
        let a = store.upsert_entity(&EntityRef::new("A", EntityType::Concept)).unwrap();
        let b = store.upsert_entity(&EntityRef::new("B", EntityType::Concept)).unwrap();
        store.upsert_edge(a, b, "relates_to", 0.9).unwrap();

        assert!(store.delete_entity(a).unwrap());
        assert!(store.get_entity(a).unwrap().is_none());
    }

    #[test]
    fn relationships_of_finds_both_directions() {
        let store = StructuredStore::open_in_memory().unwrap();
        let a = store.upsert_entity(&EntityRef::new("A", EntityType::Concept)).unwrap();
        let b = store.upsert_entity(&EntityRef::new("B", EntityType::Concept)).unwrap();
        store.upsert_edge(a, b, "relates_to", 0.9).unwrap();

        assert_eq!(store.relationships_of(a).unwrap().len(), 1);
        assert_eq!(store.relationships_of(b).unwrap().len(), 1);
    }

    #[test]
    fn entities_by_normalized_name_finds_across_types() {
        let store = StructuredStore::open_in_memory().unwrap();
        store.upsert_entity(&EntityRef::new("Python", EntityType::Technology)).unwrap();
        store.upsert_entity(&EntityRef::new("Python", EntityType::Concept)).unwrap();
        let matches = store.entities_by_normalized_name("python").unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn run_pattern_entities_by_type() {
        let store = StructuredStore::open_in_memory().unwrap();
        store.upsert_entity(&EntityRef::new("Python", EntityType::Technology)).unwrap();
        store.upsert_entity(&EntityRef::new("Rust", EntityType::Technology)).unwrap();
        store.upsert_entity(&EntityRef::new("Ada Lovelace", EntityType::Person)).unwrap();

        let rows = store
            .run_pattern("entities_by_type", &serde_json::json!({ "entity_type": "technology" }))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
