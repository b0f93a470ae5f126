//! `SQLite` implementation of [`ClusterBindingRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use crate::AccessError;
use crate::credentials::Credential;
use crate::repository::{ClusterBinding, ClusterBindingRepository, CreateClusterBinding};

/// Transaction handle used by [`SqliteClusterBindingRepository`].
pub type SqliteTx = Transaction<'static, Sqlite>;

/// `SQLite`-backed membership record store.
#[derive(Clone)]
pub struct SqliteClusterBindingRepository {
    pool: SqlitePool,
}

impl SqliteClusterBindingRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BindingRecord {
    name: String,
    cluster_ref: String,
    user_ref: String,
    created_by: String,
    certificate: Vec<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BindingRecord> for ClusterBinding {
    fn from(row: BindingRecord) -> Self {
        ClusterBinding {
            name: row.name,
            cluster_ref: row.cluster_ref,
            user_ref: row.user_ref,
            created_by: row.created_by,
            certificate: Credential::new(row.certificate),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn db_error(operation: &str, e: sqlx::Error) -> AccessError {
    match e {
        sqlx::Error::RowNotFound => AccessError::NotFound,
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AccessError::AlreadyExists,
        _ => {
            log::error!(target: "clusteraccess", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
            AccessError::DatabaseError(e.to_string())
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT name, cluster_ref, user_ref, created_by, certificate, created_at, updated_at FROM cluster_bindings";

#[async_trait]
impl ClusterBindingRepository for SqliteClusterBindingRepository {
    type Tx = SqliteTx;

    async fn begin(&self) -> Result<Self::Tx, AccessError> {
        self.pool.begin().await.map_err(|e| db_error("begin", e))
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), AccessError> {
        tx.commit().await.map_err(|e| db_error("commit", e))
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), AccessError> {
        tx.rollback().await.map_err(|e| db_error("rollback", e))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, tx), err))]
    async fn create(
        &self,
        data: CreateClusterBinding,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError> {
        let name = data.name();
        let now = Utc::now();

        let query = sqlx::query_as::<_, BindingRecord>(
            r"
            INSERT INTO cluster_bindings (name, cluster_ref, user_ref, created_by, certificate, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING name, cluster_ref, user_ref, created_by, certificate, created_at, updated_at
            ",
        )
        .bind(&name)
        .bind(&data.cluster_ref)
        .bind(&data.user_ref)
        .bind(&data.created_by)
        .bind(data.certificate.as_bytes())
        .bind(now)
        .bind(now);

        let row = match tx {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        }
        .map_err(|e| db_error("create_cluster_binding", e))?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, tx), err))]
    async fn find_by_cluster_and_user(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError> {
        let sql = format!("{SELECT_COLUMNS} WHERE cluster_ref = ? AND user_ref = ?");
        let query = sqlx::query_as::<_, BindingRecord>(&sql)
            .bind(cluster)
            .bind(username);

        let row = match tx {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        }
        .map_err(|e| db_error("find_cluster_binding", e))?;

        row.map(Into::into).ok_or(AccessError::NotFound)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, tx), err))]
    async fn find_by_cluster(
        &self,
        cluster: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<Vec<ClusterBinding>, AccessError> {
        let sql = format!("{SELECT_COLUMNS} WHERE cluster_ref = ? ORDER BY created_at ASC");
        let query = sqlx::query_as::<_, BindingRecord>(&sql).bind(cluster);

        let rows = match tx {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(|e| db_error("find_cluster_bindings_by_cluster", e))?;

        if rows.is_empty() {
            return Err(AccessError::NotFound);
        }

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, tx), err))]
    async fn touch(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError> {
        let query = sqlx::query_as::<_, BindingRecord>(
            r"
            UPDATE cluster_bindings SET updated_at = ?
            WHERE cluster_ref = ? AND user_ref = ?
            RETURNING name, cluster_ref, user_ref, created_by, certificate, created_at, updated_at
            ",
        )
        .bind(Utc::now())
        .bind(cluster)
        .bind(username);

        let row = match tx {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        }
        .map_err(|e| db_error("touch_cluster_binding", e))?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, tx), err))]
    async fn delete(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<(), AccessError> {
        let query = sqlx::query("DELETE FROM cluster_bindings WHERE cluster_ref = ? AND user_ref = ?")
            .bind(cluster)
            .bind(username);

        let result = match tx {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        };
        result.map_err(|e| db_error("delete_cluster_binding", e))?;

        Ok(())
    }
}
