use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::debug;

use shared::domain::{
    AppearanceId, AppearanceLength, EventId, Location, Slug, TalkId, WorkshopId,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} '{slug}' not found")]
    NotFound { entity: &'static str, slug: String },
    #[error("invalid value '{value}' in column {column}")]
    InvalidColumn { column: &'static str, value: String },
    #[error("failed to decode talk tags: {0}")]
    Tags(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    fn not_found(entity: &'static str, slug: &Slug) -> Self {
        StorageError::NotFound {
            entity,
            slug: slug.to_string(),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Read side of the site content plus the admin write helpers.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event_id: EventId,
    pub slug: Slug,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub location: Location,
}

/// Listing projection shared by talks and workshops.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentListing {
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
}

#[derive(Debug, Clone)]
pub struct StoredTalk {
    pub talk_id: TalkId,
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
    pub tags: Vec<String>,
    pub slides: Option<String>,
    pub events: Vec<StoredEvent>,
}

#[derive(Debug, Clone)]
pub struct StoredWorkshop {
    pub workshop_id: WorkshopId,
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
    pub slides: Option<String>,
    pub events: Vec<StoredEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceTalk {
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
    pub tags: Vec<String>,
    pub slides: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceWorkshop {
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
    pub slides: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAppearance {
    pub appearance_id: AppearanceId,
    pub date: DateTime<Utc>,
    pub length: AppearanceLength,
    pub recording: Option<String>,
    pub talk: Option<AppearanceTalk>,
    pub workshop: Option<AppearanceWorkshop>,
}

#[derive(Debug, Clone)]
pub struct StoredEventDetail {
    pub event: StoredEvent,
    pub appearances: Vec<StoredAppearance>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub slug: Slug,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct NewTalk {
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
    pub tags: Vec<String>,
    pub slides: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWorkshop {
    pub slug: Slug,
    pub title: String,
    pub abstract_md: String,
    pub slides: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppearanceTarget {
    Talk(Slug),
    Workshop(Slug),
}

#[derive(Debug, Clone)]
pub struct NewAppearance {
    pub event: Slug,
    /// `None` stores an appearance with nothing attached; readers tolerate it.
    pub target: Option<AppearanceTarget>,
    pub date: DateTime<Utc>,
    pub length: AppearanceLength,
    pub recording: Option<String>,
}

const EVENT_COLUMNS: &str =
    "e.id AS event_id, e.slug AS event_slug, e.name AS event_name, e.start_date, e.city, e.state, e.country";

impl Storage {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every in-memory connection is its own database, so keep exactly one.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .context("failed to open sqlite pool")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run content migrations")?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn all_talks(&self) -> StorageResult<Vec<ContentListing>> {
        let rows = sqlx::query(
            "SELECT slug, title, abstract FROM talks ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(listing_from_row).collect()
    }

    pub async fn talk_by_slug(&self, slug: &Slug) -> StorageResult<StoredTalk> {
        let talk_query = sqlx::query(
            "SELECT id, slug, title, abstract, tags, slides FROM talks WHERE slug = ?",
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool);
        let events_sql = format!(
            "SELECT {EVENT_COLUMNS}
             FROM appearances a
             INNER JOIN events e ON e.id = a.event_id
             INNER JOIN talks t ON t.id = a.talk_id
             WHERE t.slug = ?
             ORDER BY e.start_date DESC, a.id DESC"
        );
        let events_query = sqlx::query(&events_sql)
            .bind(slug.as_str())
            .fetch_all(&self.pool);

        let (row, event_rows) = futures::try_join!(talk_query, events_query)?;
        let row = row.ok_or_else(|| StorageError::not_found("talk", slug))?;

        Ok(StoredTalk {
            talk_id: TalkId(row.try_get("id")?),
            slug: Slug(row.try_get("slug")?),
            title: row.try_get("title")?,
            abstract_md: row.try_get("abstract")?,
            tags: decode_tags(&row.try_get::<String, _>("tags")?)?,
            slides: row.try_get("slides")?,
            events: event_rows
                .iter()
                .map(event_from_row)
                .collect::<StorageResult<_>>()?,
        })
    }

    pub async fn all_workshops(&self) -> StorageResult<Vec<ContentListing>> {
        let rows = sqlx::query(
            "SELECT slug, title, abstract FROM workshops ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(listing_from_row).collect()
    }

    pub async fn workshop_by_slug(&self, slug: &Slug) -> StorageResult<StoredWorkshop> {
        let workshop_query = sqlx::query(
            "SELECT id, slug, title, abstract, slides FROM workshops WHERE slug = ?",
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool);
        let events_sql = format!(
            "SELECT {EVENT_COLUMNS}
             FROM appearances a
             INNER JOIN events e ON e.id = a.event_id
             INNER JOIN workshops w ON w.id = a.workshop_id
             WHERE w.slug = ?
             ORDER BY e.start_date DESC, a.id DESC"
        );
        let events_query = sqlx::query(&events_sql)
            .bind(slug.as_str())
            .fetch_all(&self.pool);

        let (row, event_rows) = futures::try_join!(workshop_query, events_query)?;
        let row = row.ok_or_else(|| StorageError::not_found("workshop", slug))?;

        Ok(StoredWorkshop {
            workshop_id: WorkshopId(row.try_get("id")?),
            slug: Slug(row.try_get("slug")?),
            title: row.try_get("title")?,
            abstract_md: row.try_get("abstract")?,
            slides: row.try_get("slides")?,
            events: event_rows
                .iter()
                .map(event_from_row)
                .collect::<StorageResult<_>>()?,
        })
    }

    pub async fn all_events(&self) -> StorageResult<Vec<StoredEvent>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.start_date DESC, e.id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    pub async fn event_by_slug(&self, slug: &Slug) -> StorageResult<StoredEventDetail> {
        let event_sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.slug = ?");
        let event_query = sqlx::query(&event_sql)
            .bind(slug.as_str())
            .fetch_optional(&self.pool);
        let appearances_query = sqlx::query(
            "SELECT a.id, a.date, a.length, a.recording,
                    t.slug AS talk_slug, t.title AS talk_title, t.abstract AS talk_abstract,
                    t.tags AS talk_tags, t.slides AS talk_slides,
                    w.slug AS workshop_slug, w.title AS workshop_title,
                    w.abstract AS workshop_abstract, w.slides AS workshop_slides
             FROM appearances a
             INNER JOIN events e ON e.id = a.event_id
             LEFT JOIN talks t ON t.id = a.talk_id
             LEFT JOIN workshops w ON w.id = a.workshop_id
             WHERE e.slug = ?
             ORDER BY a.date ASC, a.id ASC",
        )
        .bind(slug.as_str())
        .fetch_all(&self.pool);

        let (row, appearance_rows) = futures::try_join!(event_query, appearances_query)?;
        let row = row.ok_or_else(|| StorageError::not_found("event", slug))?;

        Ok(StoredEventDetail {
            event: event_from_row(&row)?,
            appearances: appearance_rows
                .iter()
                .map(appearance_from_row)
                .collect::<StorageResult<_>>()?,
        })
    }

    pub async fn create_event(&self, event: &NewEvent) -> StorageResult<EventId> {
        let rec = sqlx::query(
            "INSERT INTO events (slug, name, start_date, city, state, country)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(event.slug.as_str())
        .bind(&event.name)
        .bind(event.start_date)
        .bind(&event.location.city)
        .bind(event.location.state.as_deref())
        .bind(&event.location.country)
        .fetch_one(&self.pool)
        .await?;
        let event_id = EventId(rec.try_get::<i64, _>(0)?);
        debug!(slug = %event.slug, event_id = event_id.0, "created event");
        Ok(event_id)
    }

    pub async fn create_talk(&self, talk: &NewTalk) -> StorageResult<TalkId> {
        let tags = serde_json::to_string(&talk.tags)?;
        let rec = sqlx::query(
            "INSERT INTO talks (slug, title, abstract, tags, slides)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(talk.slug.as_str())
        .bind(&talk.title)
        .bind(&talk.abstract_md)
        .bind(tags)
        .bind(talk.slides.as_deref())
        .fetch_one(&self.pool)
        .await?;
        let talk_id = TalkId(rec.try_get::<i64, _>(0)?);
        debug!(slug = %talk.slug, talk_id = talk_id.0, "created talk");
        Ok(talk_id)
    }

    pub async fn create_workshop(&self, workshop: &NewWorkshop) -> StorageResult<WorkshopId> {
        let rec = sqlx::query(
            "INSERT INTO workshops (slug, title, abstract, slides)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(workshop.slug.as_str())
        .bind(&workshop.title)
        .bind(&workshop.abstract_md)
        .bind(workshop.slides.as_deref())
        .fetch_one(&self.pool)
        .await?;
        let workshop_id = WorkshopId(rec.try_get::<i64, _>(0)?);
        debug!(slug = %workshop.slug, workshop_id = workshop_id.0, "created workshop");
        Ok(workshop_id)
    }

    pub async fn add_appearance(&self, appearance: &NewAppearance) -> StorageResult<AppearanceId> {
        let mut tx = self.pool.begin().await?;

        let event_id: i64 = sqlx::query_scalar("SELECT id FROM events WHERE slug = ?")
            .bind(appearance.event.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::not_found("event", &appearance.event))?;

        let (talk_id, workshop_id) = match &appearance.target {
            Some(AppearanceTarget::Talk(slug)) => {
                let id: i64 = sqlx::query_scalar("SELECT id FROM talks WHERE slug = ?")
                    .bind(slug.as_str())
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| StorageError::not_found("talk", slug))?;
                (Some(id), None)
            }
            Some(AppearanceTarget::Workshop(slug)) => {
                let id: i64 = sqlx::query_scalar("SELECT id FROM workshops WHERE slug = ?")
                    .bind(slug.as_str())
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| StorageError::not_found("workshop", slug))?;
                (None, Some(id))
            }
            None => (None, None),
        };

        let rec = sqlx::query(
            "INSERT INTO appearances (event_id, talk_id, workshop_id, date, length, recording)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(event_id)
        .bind(talk_id)
        .bind(workshop_id)
        .bind(appearance.date)
        .bind(appearance.length.as_db_str())
        .bind(appearance.recording.as_deref())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(AppearanceId(rec.try_get::<i64, _>(0)?))
    }
}

fn listing_from_row(row: &SqliteRow) -> StorageResult<ContentListing> {
    Ok(ContentListing {
        slug: Slug(row.try_get("slug")?),
        title: row.try_get("title")?,
        abstract_md: row.try_get("abstract")?,
    })
}

fn event_from_row(row: &SqliteRow) -> StorageResult<StoredEvent> {
    Ok(StoredEvent {
        event_id: EventId(row.try_get("event_id")?),
        slug: Slug(row.try_get("event_slug")?),
        name: row.try_get("event_name")?,
        start_date: row.try_get("start_date")?,
        location: Location {
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            country: row.try_get("country")?,
        },
    })
}

fn appearance_from_row(row: &SqliteRow) -> StorageResult<StoredAppearance> {
    let raw_length: String = row.try_get("length")?;
    let length = raw_length
        .parse::<AppearanceLength>()
        .map_err(|_| StorageError::InvalidColumn {
            column: "appearances.length",
            value: raw_length.clone(),
        })?;

    let talk = match row.try_get::<Option<String>, _>("talk_slug")? {
        Some(slug) => Some(AppearanceTalk {
            slug: Slug(slug),
            title: row.try_get("talk_title")?,
            abstract_md: row.try_get("talk_abstract")?,
            tags: decode_tags(&row.try_get::<String, _>("talk_tags")?)?,
            slides: row.try_get("talk_slides")?,
        }),
        None => None,
    };
    let workshop = match row.try_get::<Option<String>, _>("workshop_slug")? {
        Some(slug) => Some(AppearanceWorkshop {
            slug: Slug(slug),
            title: row.try_get("workshop_title")?,
            abstract_md: row.try_get("workshop_abstract")?,
            slides: row.try_get("workshop_slides")?,
        }),
        None => None,
    };

    Ok(StoredAppearance {
        appearance_id: AppearanceId(row.try_get("id")?),
        date: row.try_get("date")?,
        length,
        recording: row.try_get("recording")?,
        talk,
        workshop,
    })
}

fn decode_tags(raw: &str) -> StorageResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
