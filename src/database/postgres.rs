use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::database::store::{
    Document, DocumentCollection, Filter, ID_FIELD, StoreError, StoreResult, Update, document_id,
};

/// A document collection stored as JSONB rows of the `documents` table.
///
/// Every write is a single statement, so positional updates on the incident
/// sequence are atomic per document.
#[derive(Clone)]
pub struct PgCollection {
    pool: PgPool,
    name: String,
}

impl PgCollection {
    pub fn new(pool: PgPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
        builder
            .push("collection = ")
            .push_bind(self.name.clone());

        match filter {
            Filter::All => {}
            Filter::Eq(field, Value::String(id)) if field == ID_FIELD => {
                builder.push(" AND doc_id = ").push_bind(id.clone());
            }
            Filter::Eq(field, value) => {
                builder
                    .push(" AND body -> ")
                    .push_bind(field.clone())
                    .push(" = ")
                    .push_bind(Json(value.clone()));
            }
            Filter::Range { field, gte, lt } => {
                builder
                    .push(" AND (body ->> ")
                    .push_bind(field.clone())
                    .push(") COLLATE \"C\" >= ")
                    .push_bind(gte.clone())
                    .push(" AND (body ->> ")
                    .push_bind(field.clone())
                    .push(") COLLATE \"C\" < ")
                    .push_bind(lt.clone());
            }
        }
    }

    /// `seq = (first matching row)`; single-document writes target it.
    fn push_first_match(&self, builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
        builder.push(" WHERE seq = (SELECT seq FROM documents WHERE ");
        self.push_filter(builder, filter);
        builder.push(" ORDER BY seq LIMIT 1)");
    }
}

fn push_index_guard(builder: &mut QueryBuilder<'_, Postgres>, field: &str, index: i32) {
    builder
        .push(" AND jsonb_array_length(CASE WHEN jsonb_typeof(body -> ")
        .push_bind(field.to_string())
        .push(") = 'array' THEN body -> ")
        .push_bind(field.to_string())
        .push(" ELSE '[]'::jsonb END) > ")
        .push_bind(index);
}

#[async_trait]
impl DocumentCollection for PgCollection {
    async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE ");
        self.push_filter(&mut builder, filter);
        builder.push(" ORDER BY seq");

        let rows = builder
            .build_query_scalar::<Json<Document>>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE ");
        self.push_filter(&mut builder, filter);
        builder.push(" ORDER BY seq LIMIT 1");

        let row = builder
            .build_query_scalar::<Json<Document>>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.0))
    }

    async fn insert_one(&self, document: Document) -> StoreResult<()> {
        let id = document_id(&document)?.to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_id, body)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&self.name)
        .bind(&id)
        .bind(Json(&document))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unacknowledged(format!(
                "insert of {} into {}",
                id, self.name
            )));
        }

        Ok(())
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE documents SET body = ");

        match update {
            Update::Set(fields) => {
                builder.push("body || ").push_bind(Json(fields.clone()));
                self.push_first_match(&mut builder, filter);
            }
            Update::Push { field, value } => {
                builder
                    .push("jsonb_set(body, ARRAY[")
                    .push_bind(field.clone())
                    .push("], COALESCE(NULLIF(body -> ")
                    .push_bind(field.clone())
                    .push(", 'null'::jsonb), '[]'::jsonb) || jsonb_build_array(")
                    .push_bind(Json(value.clone()))
                    .push("))");
                self.push_first_match(&mut builder, filter);
                builder
                    .push(" AND jsonb_typeof(COALESCE(NULLIF(body -> ")
                    .push_bind(field.clone())
                    .push(", 'null'::jsonb), '[]'::jsonb)) = 'array'");
            }
            Update::PullAt { field, index } => {
                let Ok(index) = i32::try_from(*index) else {
                    return Ok(0);
                };
                builder
                    .push("jsonb_set(body, ARRAY[")
                    .push_bind(field.clone())
                    .push("], (body -> ")
                    .push_bind(field.clone())
                    .push(") - ")
                    .push_bind(index)
                    .push(")");
                self.push_first_match(&mut builder, filter);
                push_index_guard(&mut builder, field, index);
            }
            Update::ReplaceAt {
                field,
                index,
                value,
            } => {
                let Ok(index) = i32::try_from(*index) else {
                    return Ok(0);
                };
                builder
                    .push("jsonb_set(body, ARRAY[")
                    .push_bind(field.clone())
                    .push(", ")
                    .push_bind(index.to_string())
                    .push("], ")
                    .push_bind(Json(value.clone()))
                    .push(")");
                self.push_first_match(&mut builder, filter);
                push_index_guard(&mut builder, field, index);
            }
        }

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM documents");
        self.push_first_match(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        log::info!("Closing document store connection pool");
        self.pool.close().await;
    }
}
