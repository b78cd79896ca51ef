use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{DomainError, DomainResult};
use crate::models::{Film, Genre, MpaRating, NewFilm, NewUser, UpdateFilm, UpdateUser, User};
use crate::storage::{FilmRepository, GenreRepository, RatingRepository, UserRepository};

pub struct FilmService {
    films: Arc<dyn FilmRepository>,
    users: Arc<dyn UserRepository>,
    genres: Arc<dyn GenreRepository>,
    ratings: Arc<dyn RatingRepository>,
}

impl FilmService {
    pub fn new(
        films: Arc<dyn FilmRepository>,
        users: Arc<dyn UserRepository>,
        genres: Arc<dyn GenreRepository>,
        ratings: Arc<dyn RatingRepository>,
    ) -> Self {
        Self { films, users, genres, ratings }
    }

    pub async fn find_all_films(&self) -> DomainResult<Vec<Film>> {
        self.films.find_all().await
    }

    pub async fn create_film(&self, new_film: NewFilm) -> DomainResult<Film> {
        let rating_id = new_film.rating_id;
        let genre_ids = new_film.genre_ids.clone();

        let mut film = new_film.into_film();
        film.validate()?;

        if let Some(rating_id) = rating_id {
            let rating = self
                .ratings
                .find_by_id(rating_id)
                .await?
                .ok_or_else(|| DomainError::not_found("rating", rating_id))?;
            film.rating = Some(rating);
        }

        let film = self.films.create(film).await?;
        info!(id = film.id, name = %film.name, "film created");

        if !genre_ids.is_empty() {
            let resolved = self.resolve_genre_ids(&genre_ids).await?;
            if resolved.is_empty() {
                return Err(DomainError::NotFound(format!(
                    "none of the requested genre ids {genre_ids:?}"
                )));
            }
            self.films.attach_genres(film.id, &resolved).await?;
        }

        self.find_film_by_id(film.id).await
    }

    pub async fn update_film(&self, update: UpdateFilm) -> DomainResult<Film> {
        let mut film = self
            .films
            .find_by_id(update.id)
            .await?
            .ok_or_else(|| DomainError::not_found("film", update.id))?;

        if let Some(rating_id) = update.rating_id {
            let rating = self
                .ratings
                .find_by_id(rating_id)
                .await?
                .ok_or_else(|| DomainError::not_found("rating", rating_id))?;
            film.rating = Some(rating);
        }

        update.apply(&mut film);
        film.validate()?;

        debug!(id = film.id, "updating film");
        self.films.update(film).await
    }

    pub async fn find_film_by_id(&self, id: i64) -> DomainResult<Film> {
        self.films
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("film", id))
    }

    pub async fn attach_genres(&self, film_id: i64, genre_ids: &[i64]) -> DomainResult<Film> {
        self.find_film_by_id(film_id).await?;

        let resolved = self.resolve_genre_ids(genre_ids).await?;
        if resolved.is_empty() && !genre_ids.is_empty() {
            return Err(DomainError::NotFound(format!(
                "none of the requested genre ids {genre_ids:?}"
            )));
        }
        if !resolved.is_empty() {
            self.films.attach_genres(film_id, &resolved).await?;
        }
        self.find_film_by_id(film_id).await
    }

    pub async fn add_like(&self, film_id: i64, user_id: i64) -> DomainResult<()> {
        self.require_user(user_id).await?;
        self.find_film_by_id(film_id).await?;

        self.films.add_like(film_id, user_id).await?;
        info!(film_id, user_id, "like added");
        Ok(())
    }

    pub async fn remove_like(&self, film_id: i64, user_id: i64) -> DomainResult<()> {
        self.require_user(user_id).await?;
        self.find_film_by_id(film_id).await?;

        self.films.remove_like(film_id, user_id).await?;
        info!(film_id, user_id, "like removed");
        Ok(())
    }

    pub async fn popular_films(&self, count: i64) -> DomainResult<Vec<Film>> {
        if count <= 0 {
            return Err(DomainError::validation("popular film count must be positive"));
        }
        self.films.popular(count as usize).await
    }

    /// Unknown ids are dropped with a warning; deciding whether an all-unknown
    /// request is fatal is left to the caller.
    async fn resolve_genre_ids(&self, requested: &[i64]) -> DomainResult<Vec<i64>> {
        let mut seen = BTreeSet::new();
        let mut resolved = Vec::new();
        for &genre_id in requested {
            if !seen.insert(genre_id) {
                continue;
            }
            match self.genres.find_by_id(genre_id).await? {
                Some(_) => resolved.push(genre_id),
                None => warn!(genre_id, "unknown genre id, skipping"),
            }
        }
        Ok(resolved)
    }

    async fn require_user(&self, user_id: i64) -> DomainResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))
    }
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn find_all_users(&self) -> DomainResult<Vec<User>> {
        self.users.find_all().await
    }

    pub async fn create_user(&self, new_user: NewUser) -> DomainResult<User> {
        let user = new_user.into_user();
        user.validate()?;

        if self.users.find_by_email(&user.email).await?.is_some() {
            return Err(DomainError::conflict(format!(
                "email {} is already in use",
                user.email
            )));
        }

        let user = self.users.create(user).await?;
        info!(id = user.id, login = %user.login, "user created");
        Ok(user)
    }

    pub async fn update_user(&self, update: UpdateUser) -> DomainResult<User> {
        let mut user = self.require_user(update.id).await?;

        if let Some(email) = &update.email {
            if *email != user.email && self.users.find_by_email(email).await?.is_some() {
                return Err(DomainError::conflict(format!("email {email} is already in use")));
            }
        }

        update.apply(&mut user);
        user.validate()?;
        self.users.update(user).await
    }

    pub async fn find_user_by_id(&self, id: i64) -> DomainResult<User> {
        self.require_user(id).await
    }

    /// Records a one-directional edge: the friend becomes visible from the
    /// requester's side only, matching the single-row relational schema.
    /// Repeated calls are silent successes.
    pub async fn add_friend(&self, id: i64, friend_id: i64) -> DomainResult<()> {
        if id == friend_id {
            return Err(DomainError::validation("a user cannot befriend themselves"));
        }
        self.require_user(id).await?;
        self.require_user(friend_id).await?;

        if self.users.try_add_friendship(id, friend_id).await? {
            info!(id, friend_id, "friendship recorded");
        } else {
            debug!(id, friend_id, "friendship already present");
        }
        Ok(())
    }

    pub async fn remove_friend(&self, id: i64, friend_id: i64) -> DomainResult<()> {
        self.require_user(id).await?;
        self.require_user(friend_id).await?;

        if self.users.remove_friendship(id, friend_id).await? {
            info!(id, friend_id, "friendship removed");
        } else {
            debug!(id, friend_id, "no friendship edge to remove");
        }
        Ok(())
    }

    pub async fn get_friends(&self, id: i64) -> DomainResult<Vec<User>> {
        let user = self.require_user(id).await?;

        let mut friends = Vec::new();
        for &friend_id in &user.friends {
            match self.users.find_by_id(friend_id).await? {
                Some(friend) => friends.push(friend),
                None => warn!(friend_id, "dangling friend id skipped"),
            }
        }
        Ok(friends)
    }

    pub async fn common_friends(&self, id: i64, other_id: i64) -> DomainResult<Vec<User>> {
        let mine = self.get_friends(id).await?;
        let theirs = self.get_friends(other_id).await?;

        let their_ids: BTreeSet<i64> = theirs.iter().map(|u| u.id).collect();
        Ok(mine.into_iter().filter(|u| their_ids.contains(&u.id)).collect())
    }

    async fn require_user(&self, user_id: i64) -> DomainResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))
    }
}

pub struct GenreService {
    genres: Arc<dyn GenreRepository>,
}

impl GenreService {
    pub fn new(genres: Arc<dyn GenreRepository>) -> Self {
        Self { genres }
    }

    pub async fn find_all_genres(&self) -> DomainResult<Vec<Genre>> {
        self.genres.find_all().await
    }

    pub async fn find_genre_by_id(&self, id: i64) -> DomainResult<Genre> {
        self.genres
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("genre", id))
    }
}

pub struct RatingService {
    ratings: Arc<dyn RatingRepository>,
}

impl RatingService {
    pub fn new(ratings: Arc<dyn RatingRepository>) -> Self {
        Self { ratings }
    }

    pub async fn find_all_ratings(&self) -> DomainResult<Vec<MpaRating>> {
        self.ratings.find_all().await
    }

    pub async fn find_rating_by_id(&self, id: i64) -> DomainResult<MpaRating> {
        self.ratings
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("rating", id))
    }
}
