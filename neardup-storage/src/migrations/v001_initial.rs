//! v001: signatures, bucket membership, index manifest.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS signatures (
    doc_id TEXT PRIMARY KEY,
    num_perm INTEGER NOT NULL,
    signature BLOB NOT NULL,
    indexed_at INTEGER NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS bucket_members (
    band_index INTEGER NOT NULL,
    bucket_key INTEGER NOT NULL,
    doc_id TEXT NOT NULL,
    PRIMARY KEY (band_index, bucket_key, doc_id)
) STRICT, WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS index_manifest (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    manifest_json TEXT NOT NULL,
    created_at INTEGER NOT NULL
) STRICT;
";
