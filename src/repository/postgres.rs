//! PostgreSQL entity store: one JSONB `documents` table keyed by (kind, id)

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, Pool, Postgres};
use uuid::Uuid;

use super::{Collation, Document, EntityStore, Filter, FindOptions};
use crate::{
    config::StoreConfig,
    error::{AppError, AppResult},
    models::EntityKind,
};

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            data: row.data.0,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;

        Ok(Self::new(pool))
    }
}

/// Name of the collation created by the migrations for a locale
fn collation_name(collation: &Collation) -> AppResult<String> {
    if collation.locale.is_empty() || !collation.locale.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported collation locale {}",
            collation.locale
        )));
    }
    Ok(format!("{}_ci", collation.locale.to_lowercase()))
}

/// ORDER BY clause; sort fields are bound from `$first_param` onwards
fn order_clause(options: &FindOptions, first_param: usize) -> AppResult<String> {
    let collate = match &options.collation {
        Some(collation) => format!(" COLLATE \"{}\"", collation_name(collation)?),
        None => String::new(),
    };

    let mut keys: Vec<String> = options
        .sort
        .iter()
        .enumerate()
        .map(|(i, (_, direction))| {
            format!(
                "(data ->> ${}::text){} {}",
                first_param + i,
                collate,
                direction.as_sql()
            )
        })
        .collect();
    keys.push("created_at ASC".to_string());

    Ok(format!("ORDER BY {}", keys.join(", ")))
}

#[async_trait]
impl EntityStore for PgStore {
    async fn find_by_id(&self, kind: EntityKind, id: &str) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM documents WHERE kind = $1 AND id = $2",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn find_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let query = format!(
            "SELECT id, data FROM documents WHERE kind = $1 AND data @> $2 {}",
            order_clause(options, 3)?
        );

        let mut builder = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(kind.as_str())
            .bind(Json(filter.to_containment()));
        for (field, _) in &options.sort {
            builder = builder.bind(field);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn count(&self, kind: EntityKind, filter: &Filter) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE kind = $1 AND data @> $2",
        )
        .bind(kind.as_str())
        .bind(Json(filter.to_containment()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert(&self, kind: EntityKind, data: Value) -> AppResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (kind, id, data)
            VALUES ($1, $2, $3)
            RETURNING id, data
            "#,
        )
        .bind(kind.as_str())
        .bind(Uuid::new_v4().to_string())
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_by_id(
        &self,
        kind: EntityKind,
        id: &str,
        data: Value,
    ) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents SET data = $3, updated_at = NOW()
            WHERE kind = $1 AND id = $2
            RETURNING id, data
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(Json(data))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn delete_by_id(&self, kind: EntityKind, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
