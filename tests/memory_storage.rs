use std::collections::BTreeSet;
use std::sync::Arc;

use jiff::civil::date;
use reelclub::error::DomainError;
use reelclub::models::{Film, User};
use reelclub::storage::memory::{
    InMemoryFilmRepository, InMemoryGenreRepository, InMemoryRatingRepository,
    InMemoryUserRepository,
};
use reelclub::storage::{FilmRepository, GenreRepository, RatingRepository, UserRepository};

fn film_repo() -> InMemoryFilmRepository {
    InMemoryFilmRepository::new(Arc::new(InMemoryGenreRepository::seeded()))
}

fn film(name: &str, year: i16) -> Film {
    Film {
        id: 0,
        name: name.to_string(),
        description: "a film".to_string(),
        release_date: date(year, 7, 16),
        duration_minutes: 120,
        rating: None,
        genres: Vec::new(),
        liked_by: BTreeSet::new(),
    }
}

fn user(email: &str, login: &str) -> User {
    User {
        id: 0,
        email: email.to_string(),
        login: login.to_string(),
        name: login.to_string(),
        birthday: date(1990, 1, 1),
        friends: BTreeSet::new(),
    }
}

#[tokio::test]
async fn create_assigns_sequential_ids() {
    let repo = film_repo();
    let first = repo.create(film("Inception", 2010)).await.unwrap();
    let second = repo.create(film("Memento", 2000)).await.unwrap();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
}

#[tokio::test]
async fn duplicate_name_and_release_date_conflicts() {
    let repo = film_repo();
    repo.create(film("Inception", 2010)).await.unwrap();

    let mut duplicate = film("Inception", 2010);
    duplicate.duration_minutes = 148;
    let err = repo.create(duplicate).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // the original stays the sole stored entry
    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].duration_minutes, 120);
}

#[tokio::test]
async fn same_name_different_date_is_allowed() {
    let repo = film_repo();
    repo.create(film("Dune", 1984)).await.unwrap();
    assert!(repo.create(film("Dune", 2021)).await.is_ok());
}

#[tokio::test]
async fn create_ignores_caller_associations() {
    let repo = film_repo();
    let mut requested = film("Inception", 2010);
    requested.liked_by.insert(42);

    let created = repo.create(requested.clone()).await.unwrap();
    assert!(created.genres.is_empty());
    assert!(created.liked_by.is_empty());

    let found = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.name, requested.name);
    assert_eq!(found.release_date, requested.release_date);
    assert!(found.liked_by.is_empty());
}

#[tokio::test]
async fn create_rejects_invalid_film() {
    let repo = film_repo();

    let mut blank = film("", 2010);
    blank.name = "  ".to_string();
    assert!(matches!(repo.create(blank).await, Err(DomainError::Validation(_))));

    let early = film("Roundhay Garden Scene", 1888);
    assert!(matches!(repo.create(early).await, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn update_unknown_film_is_not_found() {
    let repo = film_repo();
    let mut missing = film("Ghost", 1990);
    missing.id = 7;
    assert!(matches!(repo.update(missing).await, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn update_preserves_associations() {
    let repo = film_repo();
    let created = repo.create(film("Inception", 2010)).await.unwrap();
    repo.attach_genres(created.id, &[1, 2]).await.unwrap();
    repo.add_like(created.id, 9).await.unwrap();

    let mut change = created.clone();
    change.description = "rewritten".to_string();
    let updated = repo.update(change).await.unwrap();

    assert_eq!(updated.description, "rewritten");
    assert_eq!(updated.genres.len(), 2);
    assert_eq!(updated.liked_by, BTreeSet::from([9]));
}

#[tokio::test]
async fn update_cannot_steal_name_and_date() {
    let repo = film_repo();
    repo.create(film("Inception", 2010)).await.unwrap();
    let other = repo.create(film("Memento", 2000)).await.unwrap();

    let mut stolen = other.clone();
    stolen.name = "Inception".to_string();
    stolen.release_date = date(2010, 7, 16);
    assert!(matches!(repo.update(stolen).await, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn attach_genres_is_idempotent_and_order_preserving() {
    let repo = film_repo();
    let created = repo.create(film("Inception", 2010)).await.unwrap();

    repo.attach_genres(created.id, &[2, 1]).await.unwrap();
    repo.attach_genres(created.id, &[1, 4]).await.unwrap();

    let found = repo.find_by_id(created.id).await.unwrap().unwrap();
    let ids: Vec<i64> = found.genres.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![2, 1, 4]);
}

#[tokio::test]
async fn attach_genres_rejects_unknown_ids() {
    let repo = film_repo();
    let created = repo.create(film("Inception", 2010)).await.unwrap();

    let err = repo.attach_genres(created.id, &[1, 99]).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = repo.attach_genres(404, &[1]).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_like_conflicts_and_leaves_one_like() {
    let repo = film_repo();
    let created = repo.create(film("Inception", 2010)).await.unwrap();

    repo.add_like(created.id, 1).await.unwrap();
    let err = repo.add_like(created.id, 1).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    assert_eq!(repo.likes(created.id).await.unwrap(), BTreeSet::from([1]));
}

#[tokio::test]
async fn remove_like_is_idempotent() {
    let repo = film_repo();
    let created = repo.create(film("Inception", 2010)).await.unwrap();
    repo.add_like(created.id, 1).await.unwrap();

    repo.remove_like(created.id, 1).await.unwrap();
    repo.remove_like(created.id, 1).await.unwrap();
    assert!(repo.likes(created.id).await.unwrap().is_empty());

    assert!(matches!(repo.remove_like(404, 1).await, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn popular_orders_by_likes_then_id() {
    let repo = film_repo();
    let a = repo.create(film("A", 2001)).await.unwrap();
    let b = repo.create(film("B", 2002)).await.unwrap();
    let c = repo.create(film("C", 2003)).await.unwrap();

    repo.add_like(a.id, 1).await.unwrap();
    repo.add_like(a.id, 2).await.unwrap();
    repo.add_like(c.id, 3).await.unwrap();

    let top = repo.popular(10).await.unwrap();
    let ids: Vec<i64> = top.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![a.id, c.id, b.id]);

    let top_one = repo.popular(1).await.unwrap();
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].id, a.id);
}

#[tokio::test]
async fn popular_breaks_like_ties_by_ascending_id() {
    let repo = film_repo();
    let a = repo.create(film("A", 2001)).await.unwrap();
    let b = repo.create(film("B", 2002)).await.unwrap();

    repo.add_like(a.id, 1).await.unwrap();
    repo.add_like(b.id, 1).await.unwrap();

    let ids: Vec<i64> =
        repo.popular(10).await.unwrap().iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[tokio::test]
async fn user_email_must_be_unique() {
    let repo = InMemoryUserRepository::new();
    repo.create(user("a@x.com", "a")).await.unwrap();

    let err = repo.create(user("a@x.com", "other")).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let b = repo.create(user("b@x.com", "b")).await.unwrap();
    let mut renamed = b.clone();
    renamed.email = "a@x.com".to_string();
    assert!(matches!(repo.update(renamed).await, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn find_by_email_matches_exactly() {
    let repo = InMemoryUserRepository::new();
    let created = repo.create(user("a@x.com", "a")).await.unwrap();

    assert_eq!(repo.find_by_email("a@x.com").await.unwrap().unwrap().id, created.id);
    assert!(repo.find_by_email("missing@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn try_add_friendship_signals_existing_edge() {
    let repo = InMemoryUserRepository::new();
    let a = repo.create(user("a@x.com", "a")).await.unwrap();
    let b = repo.create(user("b@x.com", "b")).await.unwrap();

    assert!(repo.try_add_friendship(a.id, b.id).await.unwrap());
    assert!(!repo.try_add_friendship(a.id, b.id).await.unwrap());

    let stored = repo.find_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(stored.friends, BTreeSet::from([b.id]));
}

#[tokio::test]
async fn remove_friendship_reports_absence() {
    let repo = InMemoryUserRepository::new();
    let a = repo.create(user("a@x.com", "a")).await.unwrap();
    let b = repo.create(user("b@x.com", "b")).await.unwrap();

    assert!(!repo.remove_friendship(a.id, b.id).await.unwrap());
    repo.try_add_friendship(a.id, b.id).await.unwrap();
    assert!(repo.remove_friendship(a.id, b.id).await.unwrap());
    assert!(!repo.remove_friendship(a.id, b.id).await.unwrap());
}

#[tokio::test]
async fn reference_catalog_is_seeded() {
    let genres = InMemoryGenreRepository::seeded();
    let all = genres.find_all().await.unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].name, "Comedy");
    assert!(genres.find_by_id(99).await.unwrap().is_none());

    let ratings = InMemoryRatingRepository::seeded();
    let all = ratings.find_all().await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[2].name, "PG-13");
}

#[tokio::test]
async fn film_serializes_with_iso_dates() {
    let repo = film_repo();
    let created = repo.create(film("Inception", 2010)).await.unwrap();

    let json = serde_json::to_value(&created).unwrap();
    assert_eq!(json["release_date"], "2010-07-16");
    assert_eq!(json["liked_by"], serde_json::json!([]));
}
