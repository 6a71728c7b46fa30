use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::diff::DiffFileModel;
use crate::error::{Error, Result};
use crate::hash::content_hash;
use crate::types::{Patch, Repo, Review, ReviewComment, SelectionPayload};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// Parent directories are created as needed. The store assumes a single
/// writing process; no cross-process coordination is attempted beyond the
/// busy timeout.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, pragma configuration fails,
/// or schema DDL fails.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut db = Connection::open(path)?;
    configure(&mut db)?;
    log::debug!("opened review database at {}", path.display());
    Ok(db)
}

/// Opens a private in-memory database with the full schema.
pub fn open_in_memory() -> Result<Connection> {
    let mut db = Connection::open_in_memory()?;
    configure(&mut db)?;
    Ok(db)
}

fn configure(db: &mut Connection) -> Result<()> {
    db.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )?;
    // busy_timeout via Connection method (not PRAGMA string).
    db.busy_timeout(Duration::from_secs(5))?;
    crate::schema::migrate(db)?;
    Ok(())
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn repo_from_row(r: &Row<'_>) -> rusqlite::Result<Repo> {
    Ok(Repo {
        id: r.get(0)?,
        path: r.get(1)?,
    })
}

fn review_from_row(r: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: r.get(0)?,
        repo_id: r.get(1)?,
        commit_sha: r.get(2)?,
        name: r.get(3)?,
        created_at: r.get(4)?,
    })
}

fn patch_from_row(r: &Row<'_>) -> rusqlite::Result<Patch> {
    Ok(Patch {
        id: r.get(0)?,
        review_id: r.get(1)?,
        seq: r.get(2)?,
        hash: r.get(3)?,
        content: r.get(4)?,
        created_at: r.get(5)?,
    })
}

const REVIEW_COLUMNS: &str = "id, repo_id, commit_sha, name, created_at";
const PATCH_COLUMNS: &str = "id, review_id, seq, hash, content, created_at";
const COMMENT_COLUMNS: &str = "id, review_id, patch_id, note_id, selections, created_at";

// ---------------------------------------------------------------------------
// Repos
// ---------------------------------------------------------------------------

/// Returns the repo row for `path`, inserting it on first reference.
///
/// # Errors
///
/// Returns an error if the lookup or the `BEGIN IMMEDIATE` insert fails.
pub fn get_or_create_repo(db: &mut Connection, path: &str) -> Result<Repo> {
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing = tx
        .query_row("SELECT id, path FROM repos WHERE path = ?1", params![path], repo_from_row)
        .optional()?;
    if let Some(repo) = existing {
        return Ok(repo);
    }
    tx.execute("INSERT INTO repos (path) VALUES (?1)", params![path])?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    log::debug!("registered repo {path} as {id}");
    Ok(Repo {
        id,
        path: path.to_owned(),
    })
}

pub fn get_repo_by_path(db: &Connection, path: &str) -> Result<Option<Repo>> {
    let repo = db
        .query_row("SELECT id, path FROM repos WHERE path = ?1", params![path], repo_from_row)
        .optional()?;
    Ok(repo)
}

pub fn get_repo(db: &Connection, id: i64) -> Result<Option<Repo>> {
    let repo = db
        .query_row("SELECT id, path FROM repos WHERE id = ?1", params![id], repo_from_row)
        .optional()?;
    Ok(repo)
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

/// Returns the review of `repo_id` at `commit_sha`, creating it if needed.
///
/// `name` is only used when the review is created; an existing review keeps
/// whatever name it was created with.
///
/// # Errors
///
/// Returns an error if the query or write transaction fails, including a
/// foreign-key failure when `repo_id` does not exist.
pub fn get_or_create_review(
    db: &mut Connection,
    repo_id: i64,
    commit_sha: &str,
    name: Option<&str>,
) -> Result<Review> {
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing = tx
        .query_row(
            &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE repo_id = ?1 AND commit_sha = ?2"),
            params![repo_id, commit_sha],
            review_from_row,
        )
        .optional()?;
    if let Some(review) = existing {
        return Ok(review);
    }

    let now = now_secs();
    tx.execute(
        "INSERT INTO reviews (repo_id, commit_sha, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![repo_id, commit_sha, name, now],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(Review {
        id,
        repo_id,
        commit_sha: commit_sha.to_owned(),
        name: name.map(str::to_owned),
        created_at: now,
    })
}

pub fn get_review(db: &Connection, id: i64) -> Result<Option<Review>> {
    let review = db
        .query_row(
            &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
            params![id],
            review_from_row,
        )
        .optional()?;
    Ok(review)
}

pub fn find_review(db: &Connection, repo_id: i64, commit_sha: &str) -> Result<Option<Review>> {
    let review = db
        .query_row(
            &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE repo_id = ?1 AND commit_sha = ?2"),
            params![repo_id, commit_sha],
            review_from_row,
        )
        .optional()?;
    Ok(review)
}

/// Lists the reviews of a repo, newest first.
pub fn list_reviews(db: &Connection, repo_id: i64) -> Result<Vec<Review>> {
    let mut stmt = db.prepare(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE repo_id = ?1
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![repo_id], review_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// Returns the patch of `review_id` whose content equals `content`, creating it
/// with the next `seq` if this content has not been seen in the review.
///
/// Lookup and insert run in one `BEGIN IMMEDIATE` transaction, so `seq` is
/// `1 + max(seq)` at the time of the insert (0 for the first patch).
///
/// # Errors
///
/// Returns an error if the query or write transaction fails.
pub fn get_or_create_patch(db: &mut Connection, review_id: i64, content: &str) -> Result<Patch> {
    let hash = content_hash(content);
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = tx
        .query_row(
            &format!("SELECT {PATCH_COLUMNS} FROM patches WHERE review_id = ?1 AND hash = ?2"),
            params![review_id, &hash],
            patch_from_row,
        )
        .optional()?;
    if let Some(patch) = existing {
        log::debug!("patch {} (seq {}) reused for review {review_id}", patch.id, patch.seq);
        return Ok(patch);
    }

    let seq: i64 = tx.query_row(
        "SELECT COALESCE(MAX(seq), -1) + 1 FROM patches WHERE review_id = ?1",
        params![review_id],
        |r| r.get(0),
    )?;
    let now = now_secs();
    tx.execute(
        "INSERT INTO patches (review_id, seq, hash, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![review_id, seq, &hash, content, now],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    log::debug!("created patch {id} (seq {seq}) for review {review_id}");

    Ok(Patch {
        id,
        review_id,
        seq,
        hash,
        content: content.to_owned(),
        created_at: now,
    })
}

/// Returns the patch with the highest `seq` in the review.
pub fn latest_patch(db: &Connection, review_id: i64) -> Result<Option<Patch>> {
    let patch = db
        .query_row(
            &format!(
                "SELECT {PATCH_COLUMNS} FROM patches WHERE review_id = ?1
                 ORDER BY seq DESC LIMIT 1"
            ),
            params![review_id],
            patch_from_row,
        )
        .optional()?;
    Ok(patch)
}

/// Lists every patch of the review in ascending `seq` order.
pub fn list_patches(db: &Connection, review_id: i64) -> Result<Vec<Patch>> {
    let mut stmt = db.prepare(&format!(
        "SELECT {PATCH_COLUMNS} FROM patches WHERE review_id = ?1 ORDER BY seq ASC"
    ))?;
    let rows = stmt
        .query_map(params![review_id], patch_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn get_patch(db: &Connection, id: i64) -> Result<Option<Patch>> {
    let patch = db
        .query_row(
            &format!("SELECT {PATCH_COLUMNS} FROM patches WHERE id = ?1"),
            params![id],
            patch_from_row,
        )
        .optional()?;
    Ok(patch)
}

pub fn get_patch_by_hash(db: &Connection, review_id: i64, hash: &str) -> Result<Option<Patch>> {
    let patch = db
        .query_row(
            &format!("SELECT {PATCH_COLUMNS} FROM patches WHERE review_id = ?1 AND hash = ?2"),
            params![review_id, hash],
            patch_from_row,
        )
        .optional()?;
    Ok(patch)
}

/// Deletes the review's patches that no comment references and that are not
/// listed in `keep_ids`. Returns how many were deleted.
///
/// Never runs implicitly; the caller decides when to collect (e.g. when a
/// review session ends).
///
/// # Errors
///
/// Returns an error if the `BEGIN IMMEDIATE` transaction fails.
pub fn prune_unreferenced_patches(
    db: &mut Connection,
    review_id: i64,
    keep_ids: &[i64],
) -> Result<usize> {
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let candidates: Vec<i64> = {
        let mut stmt = tx.prepare(
            "SELECT p.id FROM patches p
             WHERE p.review_id = ?1
               AND NOT EXISTS (
                   SELECT 1 FROM review_comments c
                   WHERE c.review_id = ?1 AND c.patch_id = p.id
               )",
        )?;
        let ids = stmt
            .query_map(params![review_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        ids
    };

    let mut deleted = 0;
    for id in candidates.into_iter().filter(|id| !keep_ids.contains(id)) {
        deleted += tx.execute("DELETE FROM patches WHERE id = ?1", params![id])?;
    }
    tx.commit()?;
    log::info!("pruned {deleted} unreferenced patches from review {review_id}");
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Comment row as stored, before the selection JSON is decoded.
struct CommentRow {
    id: i64,
    review_id: i64,
    patch_id: Option<i64>,
    note_id: i64,
    selections: Option<String>,
    created_at: i64,
}

impl CommentRow {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            review_id: r.get(1)?,
            patch_id: r.get(2)?,
            note_id: r.get(3)?,
            selections: r.get(4)?,
            created_at: r.get(5)?,
        })
    }

    fn decode(self) -> Result<ReviewComment> {
        let selections = self
            .selections
            .as_deref()
            .map(serde_json::from_str::<SelectionPayload>)
            .transpose()?;
        Ok(ReviewComment {
            id: self.id,
            review_id: self.review_id,
            patch_id: self.patch_id,
            note_id: self.note_id,
            selections,
            created_at: self.created_at,
        })
    }
}

/// Records a comment on `review_id` for the externally stored note `note_id`.
///
/// `patch_id` pins the diff version the selection refers to and must be a
/// patch of the same review. An absent or empty selection is stored as `NULL`.
///
/// # Errors
///
/// Returns `Error::PatchNotInReview` if `patch_id` names no patch of
/// `review_id`, or an error if the payload cannot be serialized or the insert
/// fails.
pub fn create_comment(
    db: &mut Connection,
    review_id: i64,
    note_id: i64,
    patch_id: Option<i64>,
    selections: Option<&SelectionPayload>,
) -> Result<ReviewComment> {
    let selections = selections.filter(|s| !s.is_empty()).cloned();
    let json = selections.as_ref().map(serde_json::to_string).transpose()?;
    let now = now_secs();

    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if let Some(patch_id) = patch_id {
        let owned: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM patches WHERE id = ?1 AND review_id = ?2)",
            params![patch_id, review_id],
            |r| r.get(0),
        )?;
        if !owned {
            return Err(Error::PatchNotInReview {
                patch_id,
                review_id,
            });
        }
    }
    tx.execute(
        "INSERT INTO review_comments (review_id, patch_id, note_id, selections, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![review_id, patch_id, note_id, json, now],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(ReviewComment {
        id,
        review_id,
        patch_id,
        note_id,
        selections,
        created_at: now,
    })
}

/// Lists the review's comments in creation order.
pub fn list_comments(db: &Connection, review_id: i64) -> Result<Vec<ReviewComment>> {
    query_comments(
        db,
        &format!("SELECT {COMMENT_COLUMNS} FROM review_comments WHERE review_id = ?1 ORDER BY id"),
        params![review_id],
    )
}

/// Lists the review's comments pinned to `patch_id`, in creation order.
pub fn comments_for_patch(
    db: &Connection,
    review_id: i64,
    patch_id: i64,
) -> Result<Vec<ReviewComment>> {
    query_comments(
        db,
        &format!(
            "SELECT {COMMENT_COLUMNS} FROM review_comments
             WHERE review_id = ?1 AND patch_id = ?2 ORDER BY id"
        ),
        params![review_id, patch_id],
    )
}

fn query_comments(
    db: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<ReviewComment>> {
    let mut stmt = db.prepare(sql)?;
    let rows = stmt
        .query_map(args, CommentRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(CommentRow::decode).collect()
}

pub fn get_comment(db: &Connection, id: i64) -> Result<Option<ReviewComment>> {
    let row = db
        .query_row(
            &format!("SELECT {COMMENT_COLUMNS} FROM review_comments WHERE id = ?1"),
            params![id],
            CommentRow::from_row,
        )
        .optional()?;
    row.map(CommentRow::decode).transpose()
}

/// Deletes a comment. Returns `false` if it did not exist.
pub fn delete_comment(db: &mut Connection, id: i64) -> Result<bool> {
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let n = tx.execute("DELETE FROM review_comments WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(n > 0)
}

/// Comments whose selection touches rows `[start_row, end_row]` of `file`.
///
/// With `patch_id`, only comments pinned to that diff version are considered,
/// since row numbers of other versions refer to different content.
pub fn comments_touching_rows(
    db: &Connection,
    review_id: i64,
    patch_id: Option<i64>,
    file: &str,
    model: &DiffFileModel,
    start_row: usize,
    end_row: usize,
) -> Result<Vec<ReviewComment>> {
    let comments = match patch_id {
        Some(patch_id) => comments_for_patch(db, review_id, patch_id)?,
        None => list_comments(db, review_id)?,
    };
    Ok(comments
        .into_iter()
        .filter(|c| {
            c.selections
                .as_ref()
                .is_some_and(|s| s.overlaps_rows(file, model, start_row, end_row))
        })
        .collect())
}
