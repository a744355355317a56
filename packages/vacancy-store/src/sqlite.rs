//! SQLite storage implementation.
//!
//! File-backed for real runs, in-memory for tests. Writes go through one
//! transaction per listing, so readers never see a listing next to a
//! half-written skill set.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::error::{Result, StoreError};
use crate::listing::{normalize_skills, Listing, SkillTag, StoredListing, UpsertOutcome};
use crate::schema;

const LISTING_COLUMNS: &str = "id, name, area, salary_from, salary_to, salary_currency, \
    experience, schedule, employment, published_at, employer_name, \
    snippet_requirement, snippet_responsibility, created_date";

/// Format written by SQLite's `CURRENT_TIMESTAMP`.
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-based vacancy store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect without touching the schema.
    ///
    /// # Example URLs
    /// - `sqlite://vacancies.db` - File-based database, created if missing
    /// - `sqlite::memory:` - use [`SqliteStore::in_memory`] instead
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::debug!(database_url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Connect and make sure the schema exists.
    pub async fn open(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Create an in-memory store with the schema applied (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Each connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create tables and indexes if absent. Safe to call repeatedly.
    pub async fn initialize_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in schema::statements() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::debug!("Schema initialized");
        Ok(())
    }

    /// Insert or replace a listing and swap in its skill tags, atomically.
    ///
    /// Any earlier row with the same id is fully superseded, including its
    /// tags and `created_date`.
    pub async fn upsert_listing<S: AsRef<str>>(
        &self,
        listing: &Listing,
        skills: &[S],
    ) -> Result<UpsertOutcome> {
        let listing = listing.clone().normalized();
        listing.validate()?;
        let skills = normalize_skills(skills);

        let mut tx = self.pool.begin().await?;

        // The first write takes SQLite's write lock, so concurrent upserts of
        // the same id queue up here instead of interleaving.
        let removed = sqlx::query("DELETE FROM skills WHERE vacancy_id = ?")
            .bind(listing.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM vacancies WHERE id = ?")
            .bind(listing.id)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO vacancies (
                id, name, area, salary_from, salary_to, salary_currency,
                experience, schedule, employment, published_at, employer_name,
                snippet_requirement, snippet_responsibility
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing.id)
        .bind(&listing.name)
        .bind(&listing.area)
        .bind(listing.salary_from)
        .bind(listing.salary_to)
        .bind(&listing.salary_currency)
        .bind(&listing.experience)
        .bind(&listing.schedule)
        .bind(&listing.employment)
        .bind(listing.published_at.map(format_timestamp))
        .bind(&listing.employer_name)
        .bind(&listing.snippet_requirement)
        .bind(&listing.snippet_responsibility)
        .execute(&mut *tx)
        .await?;

        for skill in &skills {
            sqlx::query("INSERT INTO skills (vacancy_id, skill_name) VALUES (?, ?)")
                .bind(listing.id)
                .bind(skill)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let outcome = if existing.is_some() {
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::Inserted
        };
        tracing::trace!(
            id = listing.id,
            ?outcome,
            removed_skills = removed,
            skills = skills.len(),
            "Listing upserted"
        );
        Ok(outcome)
    }

    pub async fn get_listing(&self, id: i64) -> Result<Option<StoredListing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM vacancies WHERE id = ?",
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ListingRow::into_stored).transpose()
    }

    /// Skill tags of one listing, oldest first.
    pub async fn skills_for(&self, vacancy_id: i64) -> Result<Vec<SkillTag>> {
        let tags = sqlx::query_as::<_, SkillTag>(
            "SELECT id, vacancy_id, skill_name FROM skills WHERE vacancy_id = ? ORDER BY id",
        )
        .bind(vacancy_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// Remove a listing and its skill tags. Returns whether it existed.
    pub async fn delete_listing(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM skills WHERE vacancy_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM vacancies WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    /// Filtered, ordered read backed by the declared indexes.
    pub async fn find_listings(&self, filter: &ListingFilter) -> Result<Vec<StoredListing>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM vacancies WHERE 1 = 1", LISTING_COLUMNS));

        if let Some(area) = &filter.area {
            query.push(" AND area = ").push_bind(area.clone());
        }
        if let Some(experience) = &filter.experience {
            query.push(" AND experience = ").push_bind(experience.clone());
        }
        if let Some(min_salary) = filter.min_salary {
            query
                .push(" AND (salary_from >= ")
                .push_bind(min_salary)
                .push(" OR salary_to >= ")
                .push_bind(min_salary)
                .push(")");
        }
        if let Some(published_after) = filter.published_after {
            query
                .push(" AND published_at >= ")
                .push_bind(format_timestamp(published_after));
        }

        query.push(match filter.order {
            ListingOrder::Newest => " ORDER BY published_at DESC, id DESC",
            ListingOrder::SalaryDesc => " ORDER BY COALESCE(salary_to, salary_from) DESC, id DESC",
        });
        query.push(" LIMIT ").push_bind(i64::from(filter.limit));

        let rows = query
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ListingRow::into_stored).collect()
    }

    pub async fn count_listings(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vacancies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Aggregate figures over the whole store.
    pub async fn stats(&self, top_skills: u32) -> Result<StoreStats> {
        let total_listings = self.count_listings().await?;
        let with_salary: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vacancies WHERE salary_from IS NOT NULL OR salary_to IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        let unique_employers: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT employer_name) FROM vacancies")
                .fetch_one(&self.pool)
                .await?;
        let unique_areas: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT area) FROM vacancies")
            .fetch_one(&self.pool)
            .await?;
        let unique_skills: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT skill_name) FROM skills")
            .fetch_one(&self.pool)
            .await?;

        let top_skills = sqlx::query_as::<_, SkillCount>(
            r#"
            SELECT skill_name AS name, COUNT(*) AS count
            FROM skills
            GROUP BY skill_name
            ORDER BY count DESC, skill_name
            LIMIT ?
            "#,
        )
        .bind(i64::from(top_skills))
        .fetch_all(&self.pool)
        .await?;

        Ok(StoreStats {
            total_listings,
            with_salary,
            unique_employers,
            unique_areas,
            unique_skills,
            top_skills,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingOrder {
    #[default]
    Newest,
    SalaryDesc,
}

/// Read-side filter for [`SqliteStore::find_listings`].
#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub area: Option<String>,
    pub experience: Option<String>,
    /// Matches when either salary bound reaches this value.
    pub min_salary: Option<i64>,
    pub published_after: Option<DateTime<Utc>>,
    pub order: ListingOrder,
    pub limit: u32,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            area: None,
            experience: None,
            min_salary: None,
            published_after: None,
            order: ListingOrder::Newest,
            limit: 50,
        }
    }
}

impl ListingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_experience(mut self, experience: impl Into<String>) -> Self {
        self.experience = Some(experience.into());
        self
    }

    pub fn with_min_salary(mut self, min_salary: i64) -> Self {
        self.min_salary = Some(min_salary);
        self
    }

    pub fn published_after(mut self, published_after: DateTime<Utc>) -> Self {
        self.published_after = Some(published_after);
        self
    }

    pub fn order_by(mut self, order: ListingOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SkillCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_listings: i64,
    pub with_salary: i64,
    pub unique_employers: i64,
    pub unique_areas: i64,
    pub unique_skills: i64,
    pub top_skills: Vec<SkillCount>,
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct ListingRow {
    id: i64,
    name: String,
    area: Option<String>,
    salary_from: Option<i64>,
    salary_to: Option<i64>,
    salary_currency: Option<String>,
    experience: Option<String>,
    schedule: Option<String>,
    employment: Option<String>,
    published_at: Option<String>,
    employer_name: Option<String>,
    snippet_requirement: Option<String>,
    snippet_responsibility: Option<String>,
    created_date: Option<String>,
}

impl ListingRow {
    fn into_stored(self) -> Result<StoredListing> {
        let published_at = self
            .published_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        StoreError::Decode(format!("Invalid published_at {:?}: {}", raw, e))
                    })
            })
            .transpose()?;

        let created_date = self
            .created_date
            .as_deref()
            .ok_or_else(|| StoreError::Decode(format!("listing {} has no created_date", self.id)))
            .and_then(|raw| {
                NaiveDateTime::parse_from_str(raw, SQLITE_TIMESTAMP)
                    .map_err(|e| {
                        StoreError::Decode(format!("Invalid created_date {:?}: {}", raw, e))
                    })
            })?;

        Ok(StoredListing {
            listing: Listing {
                id: self.id,
                name: self.name,
                area: self.area,
                salary_from: self.salary_from,
                salary_to: self.salary_to,
                salary_currency: self.salary_currency,
                experience: self.experience,
                schedule: self.schedule,
                employment: self.employment,
                published_at,
                employer_name: self.employer_name,
                snippet_requirement: self.snippet_requirement,
                snippet_responsibility: self.snippet_responsibility,
            },
            created_date,
        })
    }
}

/// Fixed-width UTC text so lexical order matches time order in the index.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let store = test_store().await;
        store.initialize_schema().await.unwrap();
        store.initialize_schema().await.unwrap();

        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();
        assert_eq!(
            indexes,
            vec![
                "idx_skills_vacancy_id",
                "idx_vacancies_area",
                "idx_vacancies_experience",
                "idx_vacancies_published_at",
                "idx_vacancies_salary_from",
                "idx_vacancies_salary_to",
            ]
        );
    }

    #[tokio::test]
    async fn test_round_trip_keeps_absent_salary_absent() {
        let store = test_store().await;
        let published = Utc.with_ymd_and_hms(2024, 1, 15, 7, 30, 0).unwrap();
        let mut listing = Listing::new(42, "Turner")
            .with_area("Moscow")
            .with_salary(None, Some(90000), Some("RUR"))
            .with_experience("1-3 years")
            .with_employer("Plant No. 1")
            .with_published_at(published);
        listing.schedule = Some("Shift".into());
        listing.employment = Some("Full".into());
        listing.snippet_requirement = Some("Lathe experience".into());
        listing.snippet_responsibility = Some("Turning parts".into());

        let outcome = store.upsert_listing(&listing, &["Lathe"]).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let stored = store.get_listing(42).await.unwrap().unwrap();
        assert_eq!(stored.listing, listing);
        assert_eq!(stored.listing.salary_from, None);
    }

    #[tokio::test]
    async fn test_missing_listing() {
        let store = test_store().await;
        assert!(store.get_listing(7).await.unwrap().is_none());
        assert!(store.skills_for(7).await.unwrap().is_empty());
        assert!(!store.delete_listing(7).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_listing_is_not_written() {
        let store = test_store().await;
        let err = store
            .upsert_listing(&Listing::new(5, "  "), &["TIG"])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
        assert_eq!(store.count_listings().await.unwrap(), 0);
        assert!(store.skills_for(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_key_violation_surfaces() {
        let store = test_store().await;
        let err = sqlx::query("INSERT INTO skills (vacancy_id, skill_name) VALUES (999, 'TIG')")
            .execute(store.pool())
            .await
            .unwrap_err();
        assert!(matches!(
            StoreError::from(err),
            StoreError::ConstraintViolation(_)
        ));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let store = test_store().await;
        store.close().await;
        let err = store
            .upsert_listing(&Listing::new(1, "Welder"), &["TIG"])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_delete_removes_skills() {
        let store = test_store().await;
        store
            .upsert_listing(&Listing::new(3, "Fitter"), &["Drawings", "Assembly"])
            .await
            .unwrap();
        assert!(store.delete_listing(3).await.unwrap());
        assert!(store.get_listing(3).await.unwrap().is_none());
        assert!(store.skills_for(3).await.unwrap().is_empty());
    }
}
