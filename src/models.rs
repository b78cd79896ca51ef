use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use jiff::{Zoned, civil::Date};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Release date of the first public film screening; nothing predates it.
pub const EARLIEST_RELEASE_DATE: Date = Date::constant(1895, 12, 28);

pub const MAX_DESCRIPTION_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub release_date: Date,
    pub duration_minutes: i32,
    pub rating: Option<MpaRating>,
    pub genres: Vec<Genre>,
    pub liked_by: BTreeSet<i64>,
}

impl Film {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("film name must not be empty"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(DomainError::validation(format!(
                "film description exceeds {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        if self.release_date < EARLIEST_RELEASE_DATE {
            return Err(DomainError::validation(format!(
                "release date {} predates {}",
                self.release_date, EARLIEST_RELEASE_DATE
            )));
        }
        if self.release_date > today() {
            return Err(DomainError::validation("release date must not be in the future"));
        }
        if self.duration_minutes <= 0 {
            return Err(DomainError::validation("film duration must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewFilm {
    pub name: String,
    pub description: String,
    pub release_date: Date,
    pub duration_minutes: i32,
    pub rating_id: Option<i64>,
    pub genre_ids: Vec<i64>,
}

impl NewFilm {
    /// Associations start empty; they are populated through
    /// `attach_genres` / `add_like` after the film exists.
    pub fn into_film(self) -> Film {
        Film {
            id: 0,
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration_minutes: self.duration_minutes,
            rating: None,
            genres: Vec::new(),
            liked_by: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UpdateFilm {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<Date>,
    pub duration_minutes: Option<i32>,
    pub rating_id: Option<i64>,
}

impl UpdateFilm {
    /// Merge the supplied fields onto `film`. The rating is resolved by the
    /// service before this runs, so it is not touched here.
    pub fn apply(self, film: &mut Film) {
        if let Some(name) = self.name {
            film.name = name;
        }
        if let Some(description) = self.description {
            film.description = description;
        }
        if let Some(release_date) = self.release_date {
            film.release_date = release_date;
        }
        if let Some(duration) = self.duration_minutes {
            film.duration_minutes = duration;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Date,
    pub friends: BTreeSet<i64>,
}

impl User {
    pub fn validate(&self) -> DomainResult<()> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(DomainError::validation("email must contain '@'"));
        }
        if self.login.trim().is_empty() {
            return Err(DomainError::validation("login must not be empty"));
        }
        if self.login.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("login must not contain whitespace"));
        }
        if self.birthday > today() {
            return Err(DomainError::validation("birthday must not be in the future"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    pub name: Option<String>,
    pub birthday: Date,
}

impl NewUser {
    /// Display name falls back to the login when absent or blank.
    pub fn into_user(self) -> User {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.login.clone(),
        };
        User {
            id: 0,
            email: self.email,
            login: self.login,
            name,
            birthday: self.birthday,
            friends: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UpdateUser {
    pub id: i64,
    pub email: Option<String>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub birthday: Option<Date>,
}

impl UpdateUser {
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(login) = self.login {
            user.login = login;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(birthday) = self.birthday {
            user.birthday = birthday;
        }
    }
}

/// Interchangeable by id; the name is presentation data and may drift.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl PartialEq for Genre {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Genre {}

impl Hash for Genre {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpaRating {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Genre catalog shared by both backends; the relational one seeds the same
/// rows in a migration.
pub fn reference_genres() -> Vec<Genre> {
    [
        (1, "Comedy"),
        (2, "Drama"),
        (3, "Animation"),
        (4, "Thriller"),
        (5, "Documentary"),
        (6, "Action"),
    ]
    .into_iter()
    .map(|(id, name)| Genre { id, name: name.to_string() })
    .collect()
}

pub fn reference_ratings() -> Vec<MpaRating> {
    [
        (1, "G", "General audiences, all ages admitted"),
        (2, "PG", "Parental guidance suggested"),
        (3, "PG-13", "Parents strongly cautioned, some material may be inappropriate under 13"),
        (4, "R", "Restricted, under 17 requires accompanying adult"),
        (5, "NC-17", "Adults only"),
    ]
    .into_iter()
    .map(|(id, name, description)| MpaRating {
        id,
        name: name.to_string(),
        description: Some(description.to_string()),
    })
    .collect()
}

pub(crate) fn today() -> Date {
    Zoned::now().date()
}
