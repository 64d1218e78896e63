//! SurrealDB-backed storage for gantry
//!
//! Implements `BuildStore`, `LogStore`, and `ProjectStore` on a single
//! shared connection. Supports local (in-memory), file-backed (surrealkv),
//! and cloud (WebSocket) deployments.
//!
//! Builds and log lines are written with deterministic record ids
//! (`builds:<build_id>`, `log_lines:[<build_id>, <number>]`) so repeated
//! writes of the same key converge on one record.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, info};

use gantry_domain::{Build, BuildId, BuildStatus, LogLine, ProjectRef};

use crate::error::StorageError;
use crate::migrations;
use crate::storage_traits::{BuildStore, LogStore, ProjectStore, StorageResult};

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "gantry")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new cloud configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: "gantry".to_string(),
            database: "main".to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - GANTRY_DB_ENDPOINT (required)
    /// - GANTRY_DB_USERNAME (required)
    /// - GANTRY_DB_PASSWORD (required)
    /// - GANTRY_DB_NAMESPACE (optional, default: "gantry")
    /// - GANTRY_DB_DATABASE (optional, default: "main")
    /// - GANTRY_DB_ROOT (optional, default: "false") - set to "true" for root users
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint =
            std::env::var("GANTRY_DB_ENDPOINT").map_err(|_| "GANTRY_DB_ENDPOINT not set")?;
        let username =
            std::env::var("GANTRY_DB_USERNAME").map_err(|_| "GANTRY_DB_USERNAME not set")?;
        let password =
            std::env::var("GANTRY_DB_PASSWORD").map_err(|_| "GANTRY_DB_PASSWORD not set")?;
        let namespace =
            std::env::var("GANTRY_DB_NAMESPACE").unwrap_or_else(|_| "gantry".to_string());
        let database = std::env::var("GANTRY_DB_DATABASE").unwrap_or_else(|_| "main".to_string());
        let is_root = std::env::var("GANTRY_DB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            username,
            password,
            namespace,
            database,
            is_root,
        })
    }
}

// ---------------------------------------------------------------------------
// DB row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbBuildRecord {
    build_id: u64,
    project: ProjectRef,
    status: BuildStatus,
    updated_at: SurrealDatetime,
}

impl DbBuildRecord {
    fn new(build: &Build) -> Self {
        Self {
            build_id: build.id.0,
            project: build.project.clone(),
            status: build.status,
            updated_at: Utc::now().into(),
        }
    }

    fn into_build(self) -> Build {
        Build {
            id: BuildId(self.build_id),
            project: self.project,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbProjectRecord {
    name: String,
    avg_build_duration: f64,
}

// ---------------------------------------------------------------------------
// SurrealStore
// ---------------------------------------------------------------------------

/// SurrealDB connection handle implementing all three storage traits.
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `gantry/main`, and runs `init_schema`.
    pub async fn in_memory() -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect("mem://")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        db.use_ns("gantry")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealStore connected (in-memory)");
        Ok(Self { db })
    }

    /// Connect to an explicit endpoint URL.
    ///
    /// Accepts any scheme `surrealdb::engine::any` understands, including
    /// `mem://`, `surrealkv://path`, and `ws://host:port`.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns("gantry")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealStore connected ({})", url);
        Ok(Self { db })
    }

    /// Connect using an explicit cloud configuration.
    pub async fn connect_cloud(config: &CloudConfig) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StorageError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StorageError::Connection(format!("DB auth failed: {e}")))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealStore connected (cloud)");
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Resolution order:
    /// 1. Cloud config via `GANTRY_DB_ENDPOINT` / `GANTRY_DB_USERNAME` /
    ///    `GANTRY_DB_PASSWORD` (plus optional namespace/database/root vars)
    /// 2. Explicit endpoint via `GANTRY_DB_URL`
    /// 3. Local persistence in `.gantry/db` (surrealkv)
    pub async fn from_env() -> StorageResult<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            return Self::connect_cloud(&config).await;
        }

        if let Ok(url) = std::env::var("GANTRY_DB_URL") {
            return Self::connect(&url).await;
        }

        let path = ".gantry/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Connection(format!(
                "Failed to create database directory {}: {}",
                path, e
            ))
        })?;
        let url = format!("surrealkv://{}", path);
        info!(
            "No cloud config or GANTRY_DB_URL found, using local persistence: {}",
            url
        );

        Self::connect(&url).await
    }

    /// Store or replace a project history record.
    ///
    /// Used for seeding and by deployments that maintain duration
    /// statistics out of band.
    pub async fn put_project(&self, name: &str, avg_build_duration: f64) -> StorageResult<()> {
        let row = DbProjectRecord {
            name: name.to_string(),
            avg_build_duration,
        };

        self.db
            .query("UPSERT type::thing('projects', $name) CONTENT $row")
            .bind(("name", name.to_string()))
            .bind(("row", row))
            .await?
            .check()?;

        Ok(())
    }
}

#[async_trait]
impl BuildStore for SurrealStore {
    async fn put(&self, build: &Build) -> StorageResult<()> {
        let row = DbBuildRecord::new(build);

        debug!(build_id = %build.id, status = %build.status, "storing build");

        self.db
            .query("UPSERT type::thing('builds', $id) CONTENT $row")
            .bind(("id", build.id.0))
            .bind(("row", row))
            .await?
            .check()?;

        Ok(())
    }

    async fn del(&self, ids: &[BuildId]) -> StorageResult<()> {
        for id in ids {
            debug!(build_id = %id, "deleting build");

            self.db
                .query("DELETE type::thing('builds', $id)")
                .bind(("id", id.0))
                .await?
                .check()?;
        }

        Ok(())
    }

    async fn get(&self, id: BuildId) -> StorageResult<Option<Build>> {
        let mut res = self
            .db
            .query("SELECT * FROM builds WHERE build_id = $id")
            .bind(("id", id.0))
            .await?;

        let rows: Vec<DbBuildRecord> = res.take(0)?;

        Ok(rows.into_iter().next().map(DbBuildRecord::into_build))
    }
}

#[async_trait]
impl LogStore for SurrealStore {
    async fn put(&self, lines: &[LogLine]) -> StorageResult<()> {
        for line in lines {
            self.db
                .query("UPSERT type::thing('log_lines', [$build_id, $number]) CONTENT $row")
                .bind(("build_id", line.build_id.0))
                .bind(("number", line.number))
                .bind(("row", line.clone()))
                .await?
                .check()?;
        }

        Ok(())
    }

    async fn find(&self, build_id: BuildId) -> StorageResult<Vec<LogLine>> {
        let mut res = self
            .db
            .query("SELECT * FROM log_lines WHERE build_id = $build_id ORDER BY number ASC")
            .bind(("build_id", build_id.0))
            .await?;

        let rows: Vec<LogLine> = res.take(0)?;

        Ok(rows)
    }
}

#[async_trait]
impl ProjectStore for SurrealStore {
    async fn avg_build_duration(&self, name: &str) -> StorageResult<f64> {
        let mut res = self
            .db
            .query("SELECT * FROM projects WHERE name = $name")
            .bind(("name", name.to_string()))
            .await?;

        let rows: Vec<DbProjectRecord> = res.take(0)?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.avg_build_duration)
            .unwrap_or(0.0))
    }
}
