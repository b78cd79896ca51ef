use sea_orm_migration::{prelude::*, schema::*};

/// Create a big-integer primary key column with auto-increment feature.
/// (Equivalent to sea-orm 2.0's `big_pk_auto`, which is absent in 1.1.)
fn big_pk_auto<T: IntoIden>(name: T) -> ColumnDef {
    big_integer(name).auto_increment().primary_key().take()
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Ratings::Id))
                    .col(string(Ratings::Name))
                    .col(string_null(Ratings::Description))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Genres::Id))
                    .col(string(Genres::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Films::Id))
                    .col(string(Films::Name))
                    .col(string(Films::Description))
                    .col(string(Films::ReleaseDate))
                    .col(integer(Films::Duration))
                    .col(big_integer_null(Films::RatingId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_films_rating_id")
                            .from(Films::Table, Films::RatingId)
                            .to(Ratings::Table, Ratings::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_films_name_release_date")
                    .table(Films::Table)
                    .col(Films::Name)
                    .col(Films::ReleaseDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Users::Id))
                    .col(string(Users::Email))
                    .col(string(Users::Login))
                    .col(string(Users::Name))
                    .col(string(Users::Birthday))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FilmGenres::Table)
                    .if_not_exists()
                    .col(big_pk_auto(FilmGenres::Id))
                    .col(big_integer(FilmGenres::FilmId))
                    .col(big_integer(FilmGenres::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_genres_film_id")
                            .from(FilmGenres::Table, FilmGenres::FilmId)
                            .to(Films::Table, Films::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_genres_genre_id")
                            .from(FilmGenres::Table, FilmGenres::GenreId)
                            .to(Genres::Table, Genres::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_genres_unique")
                    .table(FilmGenres::Table)
                    .col(FilmGenres::FilmId)
                    .col(FilmGenres::GenreId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FilmLikes::Table)
                    .if_not_exists()
                    .col(big_pk_auto(FilmLikes::Id))
                    .col(big_integer(FilmLikes::FilmId))
                    .col(big_integer(FilmLikes::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_likes_film_id")
                            .from(FilmLikes::Table, FilmLikes::FilmId)
                            .to(Films::Table, Films::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_film_likes_user_id")
                            .from(FilmLikes::Table, FilmLikes::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_likes_unique")
                    .table(FilmLikes::Table)
                    .col(FilmLikes::FilmId)
                    .col(FilmLikes::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Friends::Table)
                    .if_not_exists()
                    .col(big_pk_auto(Friends::Id))
                    .col(big_integer(Friends::UserId))
                    .col(big_integer(Friends::FriendId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friends_user_id")
                            .from(Friends::Table, Friends::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friends_friend_id")
                            .from(Friends::Table, Friends::FriendId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_friends_unique")
                    .table(Friends::Table)
                    .col(Friends::UserId)
                    .col(Friends::FriendId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Friends::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FilmLikes::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FilmGenres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Films::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Ratings::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Films {
    Table,
    Id,
    Name,
    Description,
    ReleaseDate,
    Duration,
    RatingId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Login,
    Name,
    Birthday,
}

#[derive(DeriveIden)]
enum FilmGenres {
    Table,
    Id,
    FilmId,
    GenreId,
}

#[derive(DeriveIden)]
enum FilmLikes {
    Table,
    Id,
    FilmId,
    UserId,
}

#[derive(DeriveIden)]
enum Friends {
    Table,
    Id,
    UserId,
    FriendId,
}
