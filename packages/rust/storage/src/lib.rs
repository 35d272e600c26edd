//! libSQL storage for user annotations (the annotation source).
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! `(cve_id, username)` claim about where a vulnerability was fixed and
//! introduced.
//!
//! **Access rules:**
//! - CLI `annotate`: read-write via [`Storage::open`]
//! - Consensus consumers: read-only snapshots via [`Storage::list_annotations`],
//!   ideally on a handle from [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use predict_shared::{Annotation, PredictError, Result, VulnerabilityId};

/// Columns read back into an [`Annotation`], in struct order.
const ANNOTATION_COLUMNS: &str =
    "cve_id, username, repo_owner, repo_name, fix_commit, fix_file, intro_commit, intro_file";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PredictError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PredictError::Storage(format!(
                "annotation database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PredictError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(PredictError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Annotation operations
    // -----------------------------------------------------------------------

    /// Insert an annotation, replacing the user's previous claim for the same CVE.
    ///
    /// The id is stored normalized (uppercase) so later lookups by
    /// [`VulnerabilityId`] find it.
    pub async fn upsert_annotation(&self, annotation: &Annotation) -> Result<()> {
        self.check_writable()?;
        let cve_id = VulnerabilityId::parse(&annotation.cve_id)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO annotations (cve_id, username, repo_owner, repo_name, fix_commit,
                                          fix_file, intro_commit, intro_file, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT(cve_id, username) DO UPDATE SET
                   repo_owner = excluded.repo_owner,
                   repo_name = excluded.repo_name,
                   fix_commit = excluded.fix_commit,
                   fix_file = excluded.fix_file,
                   intro_commit = excluded.intro_commit,
                   intro_file = excluded.intro_file,
                   updated_at = excluded.updated_at",
                params![
                    cve_id.as_str(),
                    annotation.username.as_str(),
                    annotation.repo_owner.as_str(),
                    annotation.repo_name.as_str(),
                    annotation.fix_commit.as_str(),
                    annotation.fix_file.as_str(),
                    annotation.intro_commit.as_str(),
                    annotation.intro_file.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        tracing::debug!(cve_id = %cve_id, username = %annotation.username, "stored annotation");
        Ok(())
    }

    /// Read a snapshot of annotations, optionally for a single vulnerability.
    ///
    /// Rows come back ordered by `cve_id`, then `username`.
    pub async fn list_annotations(&self, cve_id: Option<&VulnerabilityId>) -> Result<Vec<Annotation>> {
        let mut rows = match cve_id {
            Some(id) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {ANNOTATION_COLUMNS} FROM annotations
                             WHERE cve_id = ?1 ORDER BY cve_id, username"
                        ),
                        params![id.as_str()],
                    )
                    .await
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {ANNOTATION_COLUMNS} FROM annotations ORDER BY cve_id, username"
                        ),
                        params![],
                    )
                    .await
            }
        }
        .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_annotation(&row)?);
        }
        Ok(results)
    }

    /// Delete a user's annotation for a vulnerability. Returns whether a row was removed.
    pub async fn delete_annotation(&self, cve_id: &VulnerabilityId, username: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "DELETE FROM annotations WHERE cve_id = ?1 AND username = ?2",
                params![cve_id.as_str(), username],
            )
            .await
            .map_err(storage_err)?;
        Ok(affected > 0)
    }
}

fn storage_err(e: libsql::Error) -> PredictError {
    PredictError::Storage(e.to_string())
}

/// Convert a database row to an [`Annotation`].
fn row_to_annotation(row: &libsql::Row) -> Result<Annotation> {
    let text = |idx: i32| row.get::<String>(idx).map_err(storage_err);
    Ok(Annotation {
        cve_id: text(0)?,
        username: text(1)?,
        repo_owner: text(2)?,
        repo_name: text(3)?,
        fix_commit: text(4)?,
        fix_file: text(5)?,
        intro_commit: text(6)?,
        intro_file: text(7)?,
    })
}
