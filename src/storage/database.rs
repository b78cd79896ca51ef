use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use jiff::civil::Date;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};

use crate::entities::{film, film_genre, film_like, friend, genre, rating, user};
use crate::error::{DomainError, DomainResult};
use crate::models::{Film, Genre, MpaRating, User};
use crate::storage::{FilmRepository, GenreRepository, RatingRepository, UserRepository};

// Uniqueness lives in the schema here: unique indexes on (name, release_date),
// users.email, (film_id, user_id) and (user_id, friend_id) surface as
// SqlErr::UniqueConstraintViolation and are mapped to Conflict.

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn unique_conflict(err: DbErr, message: String) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::Conflict(message)
    } else {
        err.into()
    }
}

fn genre_from_row(row: genre::Model) -> Genre {
    Genre { id: row.id, name: row.name }
}

fn rating_from_row(row: rating::Model) -> MpaRating {
    MpaRating { id: row.id, name: row.name, description: row.description }
}

fn film_from_row(
    row: film::Model,
    rating: Option<MpaRating>,
    genres: Vec<Genre>,
    liked_by: BTreeSet<i64>,
) -> DomainResult<Film> {
    Ok(Film {
        id: row.id,
        name: row.name,
        description: row.description,
        release_date: row.release_date.parse::<Date>()?,
        duration_minutes: row.duration,
        rating,
        genres,
        liked_by,
    })
}

fn user_from_row(row: user::Model, friends: BTreeSet<i64>) -> DomainResult<User> {
    Ok(User {
        id: row.id,
        email: row.email,
        login: row.login,
        name: row.name,
        birthday: row.birthday.parse::<Date>()?,
        friends,
    })
}

#[derive(Clone)]
pub struct DbFilmRepository {
    db: DatabaseConnection,
}

impl DbFilmRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn compose_one(&self, row: film::Model) -> DomainResult<Film> {
        let rating = match row.rating_id {
            Some(rating_id) => rating::Entity::find_by_id(rating_id)
                .one(&self.db)
                .await?
                .map(rating_from_row),
            None => None,
        };

        let genre_rows = film_genre::Entity::find()
            .filter(film_genre::Column::FilmId.eq(row.id))
            .order_by_asc(film_genre::Column::Id)
            .all(&self.db)
            .await?;
        let genre_ids: Vec<i64> = genre_rows.iter().map(|g| g.genre_id).collect();
        let names: HashMap<i64, String> = genre::Entity::find()
            .filter(genre::Column::Id.is_in(genre_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();
        let genres = genre_ids
            .into_iter()
            .filter_map(|id| names.get(&id).map(|name| Genre { id, name: name.clone() }))
            .collect();

        let liked_by = film_like::Entity::find()
            .filter(film_like::Column::FilmId.eq(row.id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|l| l.user_id)
            .collect();

        film_from_row(row, rating, genres, liked_by)
    }

    async fn require_film(&self, film_id: i64) -> DomainResult<film::Model> {
        film::Entity::find_by_id(film_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("film", film_id))
    }
}

#[async_trait]
impl FilmRepository for DbFilmRepository {
    async fn find_all(&self) -> DomainResult<Vec<Film>> {
        let rows = film::Entity::find()
            .order_by_asc(film::Column::Id)
            .all(&self.db)
            .await?;

        let ratings: HashMap<i64, MpaRating> = rating::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| (r.id, rating_from_row(r)))
            .collect();
        let genres: HashMap<i64, Genre> = genre::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|g| (g.id, genre_from_row(g)))
            .collect();

        let mut film_genres: HashMap<i64, Vec<Genre>> = HashMap::new();
        for row in film_genre::Entity::find()
            .order_by_asc(film_genre::Column::Id)
            .all(&self.db)
            .await?
        {
            if let Some(genre) = genres.get(&row.genre_id) {
                film_genres.entry(row.film_id).or_default().push(genre.clone());
            }
        }

        let mut film_likes: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        for row in film_like::Entity::find().all(&self.db).await? {
            film_likes.entry(row.film_id).or_default().insert(row.user_id);
        }

        rows.into_iter()
            .map(|row| {
                let rating = row.rating_id.and_then(|id| ratings.get(&id).cloned());
                let genres = film_genres.remove(&row.id).unwrap_or_default();
                let liked_by = film_likes.remove(&row.id).unwrap_or_default();
                film_from_row(row, rating, genres, liked_by)
            })
            .collect()
    }

    async fn create(&self, film: Film) -> DomainResult<Film> {
        let model = film::ActiveModel {
            id: Default::default(),
            name: Set(film.name.clone()),
            description: Set(film.description.clone()),
            release_date: Set(film.release_date.to_string()),
            duration: Set(film.duration_minutes),
            rating_id: Set(film.rating.as_ref().map(|r| r.id)),
        };

        let id = film::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|err| {
                unique_conflict(
                    err,
                    format!("film '{}' released {} already exists", film.name, film.release_date),
                )
            })?
            .last_insert_id;

        let row = self.require_film(id).await?;
        self.compose_one(row).await
    }

    async fn update(&self, film: Film) -> DomainResult<Film> {
        self.require_film(film.id).await?;

        let model = film::ActiveModel {
            id: Set(film.id),
            name: Set(film.name.clone()),
            description: Set(film.description.clone()),
            release_date: Set(film.release_date.to_string()),
            duration: Set(film.duration_minutes),
            rating_id: Set(film.rating.as_ref().map(|r| r.id)),
        };

        let row = film::Entity::update(model).exec(&self.db).await.map_err(|err| {
            unique_conflict(
                err,
                format!("film '{}' released {} already exists", film.name, film.release_date),
            )
        })?;
        self.compose_one(row).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Film>> {
        let Some(row) = film::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        Ok(Some(self.compose_one(row).await?))
    }

    async fn attach_genres(&self, film_id: i64, genre_ids: &[i64]) -> DomainResult<()> {
        self.require_film(film_id).await?;

        let known: BTreeSet<i64> = genre::Entity::find()
            .filter(genre::Column::Id.is_in(genre_ids.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        if let Some(missing) = genre_ids.iter().copied().find(|id| !known.contains(id)) {
            return Err(DomainError::not_found("genre", missing));
        }

        let attached: BTreeSet<i64> = film_genre::Entity::find()
            .filter(film_genre::Column::FilmId.eq(film_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.genre_id)
            .collect();

        let mut seen = attached.clone();
        let rows: Vec<film_genre::ActiveModel> = genre_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|&genre_id| film_genre::ActiveModel {
                id: Default::default(),
                film_id: Set(film_id),
                genre_id: Set(genre_id),
            })
            .collect();

        if !rows.is_empty() {
            film_genre::Entity::insert_many(rows).exec(&self.db).await?;
        }
        Ok(())
    }

    async fn likes(&self, film_id: i64) -> DomainResult<BTreeSet<i64>> {
        self.require_film(film_id).await?;

        let rows = film_like::Entity::find()
            .filter(film_like::Column::FilmId.eq(film_id))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|row| row.user_id).collect())
    }

    async fn add_like(&self, film_id: i64, user_id: i64) -> DomainResult<()> {
        self.require_film(film_id).await?;

        let row = film_like::ActiveModel {
            id: Default::default(),
            film_id: Set(film_id),
            user_id: Set(user_id),
        };
        film_like::Entity::insert(row).exec(&self.db).await.map_err(|err| {
            unique_conflict(err, format!("user {user_id} already likes film {film_id}"))
        })?;
        Ok(())
    }

    async fn remove_like(&self, film_id: i64, user_id: i64) -> DomainResult<()> {
        self.require_film(film_id).await?;

        film_like::Entity::delete_many()
            .filter(film_like::Column::FilmId.eq(film_id))
            .filter(film_like::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn popular(&self, limit: usize) -> DomainResult<Vec<Film>> {
        let mut films = self.find_all().await?;
        films.sort_by(|a, b| {
            b.liked_by.len().cmp(&a.liked_by.len()).then(a.id.cmp(&b.id))
        });
        films.truncate(limit);
        Ok(films)
    }
}

#[derive(Clone)]
pub struct DbUserRepository {
    db: DatabaseConnection,
}

impl DbUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn friend_ids(&self, user_id: i64) -> DomainResult<BTreeSet<i64>> {
        let rows = friend::Entity::find()
            .filter(friend::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|row| row.friend_id).collect())
    }
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let rows = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        let mut edges: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        for row in friend::Entity::find().all(&self.db).await? {
            edges.entry(row.user_id).or_default().insert(row.friend_id);
        }

        rows.into_iter()
            .map(|row| {
                let friends = edges.remove(&row.id).unwrap_or_default();
                user_from_row(row, friends)
            })
            .collect()
    }

    async fn create(&self, user: User) -> DomainResult<User> {
        let model = user::ActiveModel {
            id: Default::default(),
            email: Set(user.email.clone()),
            login: Set(user.login.clone()),
            name: Set(user.name.clone()),
            birthday: Set(user.birthday.to_string()),
        };

        let id = user::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|err| {
                unique_conflict(err, format!("email {} is already in use", user.email))
            })?
            .last_insert_id;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    async fn update(&self, user: User) -> DomainResult<User> {
        user::Entity::find_by_id(user.id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user.id))?;

        let model = user::ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            login: Set(user.login.clone()),
            name: Set(user.name.clone()),
            birthday: Set(user.birthday.to_string()),
        };

        let row = user::Entity::update(model).exec(&self.db).await.map_err(|err| {
            unique_conflict(err, format!("email {} is already in use", user.email))
        })?;
        let friends = self.friend_ids(row.id).await?;
        user_from_row(row, friends)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>> {
        let Some(row) = user::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let friends = self.friend_ids(row.id).await?;
        Ok(Some(user_from_row(row, friends)?))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let Some(row) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let friends = self.friend_ids(row.id).await?;
        Ok(Some(user_from_row(row, friends)?))
    }

    async fn try_add_friendship(&self, user_id: i64, friend_id: i64) -> DomainResult<bool> {
        let txn = self.db.begin().await?;

        let existing = friend::Entity::find()
            .filter(friend::Column::UserId.eq(user_id))
            .filter(friend::Column::FriendId.eq(friend_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.commit().await?;
            return Ok(false);
        }

        let row = friend::ActiveModel {
            id: Default::default(),
            user_id: Set(user_id),
            friend_id: Set(friend_id),
        };
        match friend::Entity::insert(row).exec(&txn).await {
            Ok(_) => {
                txn.commit().await?;
                Ok(true)
            },
            // A concurrent writer beat us to the edge; same soft signal.
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                Ok(false)
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_friendship(&self, user_id: i64, friend_id: i64) -> DomainResult<bool> {
        let result = friend::Entity::delete_many()
            .filter(friend::Column::UserId.eq(user_id))
            .filter(friend::Column::FriendId.eq(friend_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[derive(Clone)]
pub struct DbGenreRepository {
    db: DatabaseConnection,
}

impl DbGenreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GenreRepository for DbGenreRepository {
    async fn find_all(&self) -> DomainResult<Vec<Genre>> {
        let rows = genre::Entity::find()
            .order_by_asc(genre::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(genre_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Genre>> {
        let row = genre::Entity::find_by_id(id).one(&self.db).await?;
        Ok(row.map(genre_from_row))
    }
}

#[derive(Clone)]
pub struct DbRatingRepository {
    db: DatabaseConnection,
}

impl DbRatingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RatingRepository for DbRatingRepository {
    async fn find_all(&self) -> DomainResult<Vec<MpaRating>> {
        let rows = rating::Entity::find()
            .order_by_asc(rating::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(rating_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<MpaRating>> {
        let row = rating::Entity::find_by_id(id).one(&self.db).await?;
        Ok(row.map(rating_from_row))
    }
}
