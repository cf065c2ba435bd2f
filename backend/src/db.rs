use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use tracing::debug;

use crate::{
    error::AppError,
    models::page::PageId,
    store::{PageRepository, Space, SpaceSnapshot},
};

pub fn init_pool(database_url: &str) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(database_url)
        .map_err(AppError::Database)
}

pub async fn prepare_schema(pool: &PgPool, reset: bool) -> Result<(), AppError> {
    if reset {
        reset_schema(pool).await?;
    }
    create_schema(pool).await
}

async fn reset_schema(pool: &PgPool) -> Result<(), AppError> {
    let drop_statements = [
        "DROP TABLE IF EXISTS page_restrictions",
        "DROP TABLE IF EXISTS page_labels",
        "DROP TABLE IF EXISTS spaces",
        "DROP TABLE IF EXISTS pages",
    ];

    for statement in drop_statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
    }

    Ok(())
}

async fn create_schema(pool: &PgPool) -> Result<(), AppError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id BIGSERIAL PRIMARY KEY,
            space_id BIGINT NOT NULL,
            parent_id BIGINT REFERENCES pages(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            position INTEGER,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT pages_space_title UNIQUE (space_id, title)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS spaces (
            id BIGSERIAL PRIMARY KEY,
            key TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            root_page_id BIGINT REFERENCES pages(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS page_labels (
            page_id BIGINT NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            PRIMARY KEY (page_id, name)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS page_restrictions (
            page_id BIGINT NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
            username TEXT NOT NULL,
            PRIMARY KEY (page_id, username)
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_pages_space ON pages (space_id)",
        "CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages (parent_id)",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
    }

    Ok(())
}

/// Loads whole spaces from Postgres, one snapshot per request.
///
/// Every call reads all pages, labels and restrictions of the space, so a
/// sidebar request costs time proportional to the space size. Nothing is
/// cached between requests.
#[derive(Clone)]
pub struct PgPageRepository {
    pool: PgPool,
}

impl PgPageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SpaceRow {
    id: i64,
    key: String,
    root_page_id: Option<i64>,
}

#[derive(FromRow)]
struct PageRow {
    id: i64,
    parent_id: Option<i64>,
    title: String,
    position: Option<i32>,
}

#[derive(FromRow)]
struct LabelRow {
    page_id: i64,
    name: String,
}

#[derive(FromRow)]
struct RestrictionRow {
    page_id: i64,
    username: String,
}

#[async_trait]
impl PageRepository for PgPageRepository {
    async fn load_space(&self, space_id: i64) -> Result<Option<Arc<SpaceSnapshot>>, AppError> {
        let Some(space) = sqlx::query_as::<_, SpaceRow>(
            "SELECT id, key, root_page_id FROM spaces WHERE id = $1 LIMIT 1",
        )
        .bind(space_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        else {
            return Ok(None);
        };

        let pages = sqlx::query_as::<_, PageRow>(
            "SELECT id, parent_id, title, position FROM pages WHERE space_id = $1 ORDER BY id",
        )
        .bind(space.id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let labels = sqlx::query_as::<_, LabelRow>(
            r#"
            SELECT l.page_id, l.name
            FROM page_labels l
            JOIN pages p ON p.id = l.page_id
            WHERE p.space_id = $1
            "#,
        )
        .bind(space.id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let restrictions = sqlx::query_as::<_, RestrictionRow>(
            r#"
            SELECT r.page_id, r.username
            FROM page_restrictions r
            JOIN pages p ON p.id = r.page_id
            WHERE p.space_id = $1
            "#,
        )
        .bind(space.id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        debug!(
            space_id = space.id,
            pages = pages.len(),
            labels = labels.len(),
            restrictions = restrictions.len(),
            "loaded space"
        );

        let mut builder = SpaceSnapshot::builder(Space {
            id: space.id,
            key: space.key,
            root_page_id: space.root_page_id.map(PageId),
        });
        for page in pages {
            builder = builder.page(page.id, page.parent_id, &page.title, page.position);
        }
        for label in labels {
            builder = builder.label(label.page_id, &label.name);
        }
        for restriction in restrictions {
            builder = builder.restrict(restriction.page_id, &restriction.username);
        }

        Ok(Some(Arc::new(builder.build())))
    }
}
