use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::models::{Film, Genre, MpaRating, User, reference_genres, reference_ratings};
use crate::storage::{FilmRepository, GenreRepository, RatingRepository, UserRepository};

// Id assignment and uniqueness probes happen under the same write lock as
// the insert, so concurrent creates cannot observe the same sequence value.

#[derive(Default)]
struct FilmStore {
    films: BTreeMap<i64, Film>,
    next_id: i64,
}

impl FilmStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct InMemoryFilmRepository {
    genres: Arc<dyn GenreRepository>,
    store: RwLock<FilmStore>,
}

impl InMemoryFilmRepository {
    pub fn new(genres: Arc<dyn GenreRepository>) -> Self {
        Self { genres, store: RwLock::new(FilmStore::default()) }
    }
}

#[async_trait]
impl FilmRepository for InMemoryFilmRepository {
    async fn find_all(&self) -> DomainResult<Vec<Film>> {
        let store = self.store.read().unwrap();
        Ok(store.films.values().cloned().collect())
    }

    async fn create(&self, mut film: Film) -> DomainResult<Film> {
        film.validate()?;

        let mut store = self.store.write().unwrap();
        if store
            .films
            .values()
            .any(|f| f.name == film.name && f.release_date == film.release_date)
        {
            return Err(DomainError::conflict(format!(
                "film '{}' released {} already exists",
                film.name, film.release_date
            )));
        }

        film.id = store.next_id();
        film.genres.clear();
        film.liked_by.clear();
        store.films.insert(film.id, film.clone());

        debug!(id = film.id, name = %film.name, "film stored");
        Ok(film)
    }

    async fn update(&self, film: Film) -> DomainResult<Film> {
        film.validate()?;

        let mut store = self.store.write().unwrap();
        let existing = store
            .films
            .get(&film.id)
            .ok_or_else(|| DomainError::not_found("film", film.id))?;

        if store.films.values().any(|f| {
            f.id != film.id && f.name == film.name && f.release_date == film.release_date
        }) {
            return Err(DomainError::conflict(format!(
                "film '{}' released {} already exists",
                film.name, film.release_date
            )));
        }

        // Associations are owned by attach_genres / add_like, not by update.
        let updated = Film {
            genres: existing.genres.clone(),
            liked_by: existing.liked_by.clone(),
            ..film
        };
        store.films.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Film>> {
        let store = self.store.read().unwrap();
        Ok(store.films.get(&id).cloned())
    }

    async fn attach_genres(&self, film_id: i64, genre_ids: &[i64]) -> DomainResult<()> {
        // Resolve before taking the lock; the lock is never held across await.
        let mut resolved = Vec::with_capacity(genre_ids.len());
        for &genre_id in genre_ids {
            let genre = self
                .genres
                .find_by_id(genre_id)
                .await?
                .ok_or_else(|| DomainError::not_found("genre", genre_id))?;
            resolved.push(genre);
        }

        let mut store = self.store.write().unwrap();
        let film = store
            .films
            .get_mut(&film_id)
            .ok_or_else(|| DomainError::not_found("film", film_id))?;

        for genre in resolved {
            if !film.genres.contains(&genre) {
                film.genres.push(genre);
            }
        }
        Ok(())
    }

    async fn likes(&self, film_id: i64) -> DomainResult<BTreeSet<i64>> {
        let store = self.store.read().unwrap();
        let film = store
            .films
            .get(&film_id)
            .ok_or_else(|| DomainError::not_found("film", film_id))?;
        Ok(film.liked_by.clone())
    }

    async fn add_like(&self, film_id: i64, user_id: i64) -> DomainResult<()> {
        let mut store = self.store.write().unwrap();
        let film = store
            .films
            .get_mut(&film_id)
            .ok_or_else(|| DomainError::not_found("film", film_id))?;

        if !film.liked_by.insert(user_id) {
            return Err(DomainError::conflict(format!(
                "user {user_id} already likes film {film_id}"
            )));
        }
        Ok(())
    }

    async fn remove_like(&self, film_id: i64, user_id: i64) -> DomainResult<()> {
        let mut store = self.store.write().unwrap();
        let film = store
            .films
            .get_mut(&film_id)
            .ok_or_else(|| DomainError::not_found("film", film_id))?;

        film.liked_by.remove(&user_id);
        Ok(())
    }

    async fn popular(&self, limit: usize) -> DomainResult<Vec<Film>> {
        let store = self.store.read().unwrap();
        let mut films: Vec<Film> = store.films.values().cloned().collect();
        films.sort_by(|a, b| {
            b.liked_by.len().cmp(&a.liked_by.len()).then(a.id.cmp(&b.id))
        });
        films.truncate(limit);
        Ok(films)
    }
}

#[derive(Default)]
struct UserStore {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl UserStore {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    store: RwLock<UserStore>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let store = self.store.read().unwrap();
        Ok(store.users.values().cloned().collect())
    }

    async fn create(&self, mut user: User) -> DomainResult<User> {
        user.validate()?;

        let mut store = self.store.write().unwrap();
        if store.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::conflict(format!("email {} is already in use", user.email)));
        }

        user.id = store.next_id();
        user.friends.clear();
        store.users.insert(user.id, user.clone());

        debug!(id = user.id, login = %user.login, "user stored");
        Ok(user)
    }

    async fn update(&self, user: User) -> DomainResult<User> {
        user.validate()?;

        let mut store = self.store.write().unwrap();
        let existing = store
            .users
            .get(&user.id)
            .ok_or_else(|| DomainError::not_found("user", user.id))?;

        if store.users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(DomainError::conflict(format!("email {} is already in use", user.email)));
        }

        let updated = User { friends: existing.friends.clone(), ..user };
        store.users.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>> {
        let store = self.store.read().unwrap();
        Ok(store.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let store = self.store.read().unwrap();
        Ok(store.users.values().find(|u| u.email == email).cloned())
    }

    async fn try_add_friendship(&self, user_id: i64, friend_id: i64) -> DomainResult<bool> {
        let mut store = self.store.write().unwrap();
        let user = store
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found("user", user_id))?;
        Ok(user.friends.insert(friend_id))
    }

    async fn remove_friendship(&self, user_id: i64, friend_id: i64) -> DomainResult<bool> {
        let mut store = self.store.write().unwrap();
        match store.users.get_mut(&user_id) {
            Some(user) => Ok(user.friends.remove(&friend_id)),
            None => Ok(false),
        }
    }
}

pub struct InMemoryGenreRepository {
    genres: BTreeMap<i64, Genre>,
}

impl InMemoryGenreRepository {
    /// The reference catalog the relational backend seeds in its migration.
    pub fn seeded() -> Self {
        Self::from_genres(reference_genres())
    }

    pub fn from_genres(genres: impl IntoIterator<Item = Genre>) -> Self {
        Self { genres: genres.into_iter().map(|g| (g.id, g)).collect() }
    }
}

#[async_trait]
impl GenreRepository for InMemoryGenreRepository {
    async fn find_all(&self) -> DomainResult<Vec<Genre>> {
        Ok(self.genres.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Genre>> {
        Ok(self.genres.get(&id).cloned())
    }
}

pub struct InMemoryRatingRepository {
    ratings: BTreeMap<i64, MpaRating>,
}

impl InMemoryRatingRepository {
    pub fn seeded() -> Self {
        Self::from_ratings(reference_ratings())
    }

    pub fn from_ratings(ratings: impl IntoIterator<Item = MpaRating>) -> Self {
        Self { ratings: ratings.into_iter().map(|r| (r.id, r)).collect() }
    }
}

#[async_trait]
impl RatingRepository for InMemoryRatingRepository {
    async fn find_all(&self) -> DomainResult<Vec<MpaRating>> {
        Ok(self.ratings.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<MpaRating>> {
        Ok(self.ratings.get(&id).cloned())
    }
}
