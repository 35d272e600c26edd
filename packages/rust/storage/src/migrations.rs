//! SQL migration definitions for the annotation database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: annotations",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per (vulnerability, user) claim
CREATE TABLE IF NOT EXISTS annotations (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    cve_id       TEXT NOT NULL,
    username     TEXT NOT NULL,
    repo_owner   TEXT NOT NULL,
    repo_name    TEXT NOT NULL,
    fix_commit   TEXT NOT NULL,
    fix_file     TEXT NOT NULL,
    intro_commit TEXT NOT NULL,
    intro_file   TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE(cve_id, username)
);

CREATE INDEX IF NOT EXISTS idx_annotations_cve_id ON annotations(cve_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
