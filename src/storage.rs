//! Repository contracts shared by the in-memory and relational backends.
//!
//! Every operation has exactly one documented behavior; the two backends are
//! drop-in replacements for each other and are tested against the same
//! properties.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::models::{Film, Genre, MpaRating, User};

pub mod database;
pub mod memory;

#[async_trait]
pub trait FilmRepository: Send + Sync {
    /// All films, ordered by ascending id.
    async fn find_all(&self) -> DomainResult<Vec<Film>>;

    /// Persist a new film and assign its id. Caller-supplied `genres` and
    /// `liked_by` are ignored; associations are built through
    /// `attach_genres` / `add_like`. Fails with `Conflict` when another film
    /// has the same (name, release_date) pair.
    async fn create(&self, film: Film) -> DomainResult<Film>;

    /// Replace the mutable fields of an existing film. `NotFound` for an
    /// unknown id, `Conflict` when the new (name, release_date) pair
    /// collides with another film.
    async fn update(&self, film: Film) -> DomainResult<Film>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Film>>;

    /// Idempotent additive upsert of film↔genre associations. `NotFound`
    /// when the film or any genre id is unknown.
    async fn attach_genres(&self, film_id: i64, genre_ids: &[i64]) -> DomainResult<()>;

    /// Ids of the users that like the film. `NotFound` for an unknown film.
    async fn likes(&self, film_id: i64) -> DomainResult<BTreeSet<i64>>;

    /// `Conflict` when the like already exists.
    async fn add_like(&self, film_id: i64, user_id: i64) -> DomainResult<()>;

    /// Idempotent: removing an absent like succeeds silently. `NotFound`
    /// only for an unknown film.
    async fn remove_like(&self, film_id: i64, user_id: i64) -> DomainResult<()>;

    /// Top `limit` films by number of distinct liking users, descending,
    /// ties broken by ascending id.
    async fn popular(&self, limit: usize) -> DomainResult<Vec<Film>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> DomainResult<Vec<User>>;

    /// Persist a new user and assign its id. `Conflict` when the email is
    /// already taken.
    async fn create(&self, user: User) -> DomainResult<User>;

    /// `NotFound` for an unknown id, `Conflict` when the email now collides
    /// with another user.
    async fn update(&self, user: User) -> DomainResult<User>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    /// Record a directed friendship edge. Returns false without error when
    /// the edge already exists. The check-then-insert is atomic.
    async fn try_add_friendship(&self, user_id: i64, friend_id: i64) -> DomainResult<bool>;

    /// Returns false when the edge did not exist.
    async fn remove_friendship(&self, user_id: i64, friend_id: i64) -> DomainResult<bool>;
}

#[async_trait]
pub trait GenreRepository: Send + Sync {
    async fn find_all(&self) -> DomainResult<Vec<Genre>>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Genre>>;
}

#[async_trait]
pub trait RatingRepository: Send + Sync {
    async fn find_all(&self) -> DomainResult<Vec<MpaRating>>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<MpaRating>>;
}
