//! SurrealDB schema migrations and initialization
//!
//! This module provides initialization functions to set up all tables
//! with proper constraints and indexes.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// Initialize all gantry tables in SurrealDB
///
/// This should be called once on first connection to set up the schema.
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing gantry SurrealDB schema");

    init_builds_table(db).await?;
    init_log_lines_table(db).await?;
    init_projects_table(db).await?;

    info!("Gantry schema initialization complete");
    Ok(())
}

/// Initialize `builds` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE builds {
///   build_id:    INT (primary key, unique)
///   project:     OBJECT { name: STRING, avg_build_duration: FLOAT? }
///   status:      STRING (enum: queued | running | succeeded | failed | canceled)
///   updated_at:  DATETIME
/// }
/// ```
///
/// Constraints:
/// - `build_id` is unique (one record per build)
/// - Records are deleted when a build leaves the active set
async fn init_builds_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing builds table");

    let sql = r#"
        DEFINE TABLE builds
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete FULL;

        -- Ensure build_id is unique
        DEFINE INDEX idx_build_id ON TABLE builds COLUMNS build_id UNIQUE;

        -- Index project name for per-project listings
        DEFINE INDEX idx_project_name ON TABLE builds COLUMNS project.name;

        -- Index status for active-build queries
        DEFINE INDEX idx_status ON TABLE builds COLUMNS status;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    info!("✓ builds table initialized");
    Ok(())
}

/// Initialize `log_lines` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE log_lines {
///   build_id:  INT (foreign key to builds.build_id)
///   number:    INT (1-indexed line number within build)
///   text:      STRING (line content, newline and CR free)
/// }
/// ```
///
/// Constraints:
/// - `(build_id, number)` is unique. A line stored again under the same
///   number replaces the previous snapshot, which is how partially
///   received lines converge on their final text.
async fn init_log_lines_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing log_lines table");

    let sql = r#"
        DEFINE TABLE log_lines
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        -- Composite unique index: one record per (build_id, number)
        -- This is the most critical constraint for line convergence
        DEFINE INDEX idx_build_id_number ON TABLE log_lines COLUMNS build_id, number UNIQUE;

        -- Index build_id for fast line retrieval by build
        DEFINE INDEX idx_build_id ON TABLE log_lines COLUMNS build_id;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    info!("✓ log_lines table initialized");
    Ok(())
}

/// Initialize `projects` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE projects {
///   name:                STRING (primary key, unique)
///   avg_build_duration:  FLOAT (seconds, 0.0 when unknown)
/// }
/// ```
async fn init_projects_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing projects table");

    let sql = r#"
        DEFINE TABLE projects
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        -- Ensure project name is unique
        DEFINE INDEX idx_name ON TABLE projects COLUMNS name UNIQUE;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    info!("✓ projects table initialized");
    Ok(())
}
