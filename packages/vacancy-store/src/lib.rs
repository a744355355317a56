//! SQLite persistence for vacancy listings.
//!
//! Listings live in `vacancies`, keyed by the source id. Each listing owns a
//! set of skill strings in `skills`. Writing a listing replaces any earlier
//! row with the same id together with its whole skill set, inside one
//! transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use vacancy_store::{Listing, SqliteStore};
//!
//! let store = SqliteStore::open("sqlite://vacancies.db").await?;
//! let listing = Listing::new(100, "Welder").with_area("2");
//! store.upsert_listing(&listing, &["TIG", "MIG"]).await?;
//! ```

pub mod error;
pub mod listing;
pub mod schema;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use listing::{normalize_skills, Listing, SkillTag, StoredListing, UpsertOutcome};
pub use sqlite::{ListingFilter, ListingOrder, SkillCount, SqliteStore, StoreStats};
