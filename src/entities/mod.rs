pub mod film;
pub mod film_genre;
pub mod film_like;
pub mod friend;
pub mod genre;
pub mod rating;
pub mod user;
