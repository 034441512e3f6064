//! Database migrations for the shared SQLite file backing C2 and C3.

/// Ordered schema migrations, applied in sequence.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Memories table with enriched curator fields",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Entities, relationships, and memory-entity links",
        up: MIGRATION_V2_UP,
    },
];

/// A single forward-only schema migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    content_norm TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    concepts TEXT NOT NULL DEFAULT '[]',
    surfaces_when TEXT NOT NULL DEFAULT '[]',
    layer TEXT NOT NULL,
    sublayer TEXT NOT NULL,
    memory_type TEXT NOT NULL,
    domain TEXT NOT NULL DEFAULT 'general',
    importance INTEGER NOT NULL,
    authority_score REAL NOT NULL,
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    superseded_by_id TEXT,
    potential_conflicts TEXT NOT NULL DEFAULT '[]',
    archived INTEGER NOT NULL DEFAULT 0,
    custom TEXT,
    embedding BLOB
);

CREATE INDEX IF NOT EXISTS idx_memories_domain ON memories(domain);
CREATE INDEX IF NOT EXISTS idx_memories_layer_sublayer ON memories(layer, sublayer);
CREATE INDEX IF NOT EXISTS idx_memories_archived ON memories(archived);
CREATE INDEX IF NOT EXISTS idx_memories_last_accessed ON memories(last_accessed);
CREATE INDEX IF NOT EXISTS idx_memories_content_norm ON memories(content_norm);
";

const MIGRATION_V2_UP: &str = r"
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    properties TEXT NOT NULL DEFAULT 'null'
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_identity
    ON entities(normalized_name, entity_type);

CREATE TABLE IF NOT EXISTS relationships (
    id TEXT PRIMARY KEY,
    from_id TEXT NOT NULL REFERENCES entities(id),
    to_id TEXT NOT NULL REFERENCES entities(id),
    relationship_type TEXT NOT NULL,
    strength REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_id);
CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_id);

CREATE TABLE IF NOT EXISTS memory_entities (
    memory_id TEXT NOT NULL REFERENCES memories(id),
    entity_id TEXT NOT NULL REFERENCES entities(id),
    PRIMARY KEY (memory_id, entity_id)
);

CREATE INDEX IF NOT EXISTS idx_memory_entities_entity ON memory_entities(entity_id);
";

fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply every migration newer than the database's current
/// `user_version`, bumping `user_version` as each one lands.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(version = migration.version, description = migration.description, "applying migration");
            conn.execute_batch(migration.up)?;
            conn.pragma_update(None, "user_version", migration.version)?;
            applied += 1;
        }
    }

    Ok(applied)
}
