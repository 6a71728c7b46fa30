/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the full v1 schema.
///
/// Four tables, read directly by sibling tools, so column names are stable:
/// - `repos`: one row per working-tree root, unique on `path`.
/// - `reviews`: one row per `(repo, commit)` pair.
/// - `patches`: content-addressed diff snapshots, `seq` numbered per review.
/// - `review_comments`: links an external note to a review, a patch and a selection.
///
/// `review_comments.patch_id` is what patch pruning counts as a reference.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS repos (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        path        TEXT    NOT NULL UNIQUE
    ) STRICT;

    CREATE TABLE IF NOT EXISTS reviews (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_id     INTEGER NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
        commit_sha  TEXT    NOT NULL,
        name        TEXT,
        created_at  INTEGER NOT NULL,
        UNIQUE (repo_id, commit_sha)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS patches (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id   INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        seq         INTEGER NOT NULL,
        hash        TEXT    NOT NULL,
        content     TEXT    NOT NULL,
        created_at  INTEGER NOT NULL,
        UNIQUE (review_id, seq),
        UNIQUE (review_id, hash)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS review_comments (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id   INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        patch_id    INTEGER REFERENCES patches(id) ON DELETE SET NULL,
        note_id     INTEGER NOT NULL,
        selections  TEXT,
        created_at  INTEGER NOT NULL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_review_comments_review
        ON review_comments(review_id);
    CREATE INDEX IF NOT EXISTS idx_review_comments_patch
        ON review_comments(patch_id);
";

/// Latest schema version understood by this crate.
pub const LATEST_VERSION: i64 = 1;

/// Runs forward-only schema migration to bring the DB to [`LATEST_VERSION`].
///
/// Idempotent: safe to call on every open. Creates `schema_version` if needed,
/// reads the current version (`0` when empty) and applies each missing step
/// inside a `BEGIN IMMEDIATE` transaction.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        log::info!("migrating review database to schema v1");
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
