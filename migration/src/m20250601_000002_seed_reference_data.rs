use sea_orm_migration::prelude::*;

// Must stay in sync with the in-memory reference catalog; both backends are
// expected to serve identical genre and rating rows.

const GENRES: [(i64, &str); 6] = [
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Animation"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

const RATINGS: [(i64, &str, &str); 5] = [
    (1, "G", "General audiences, all ages admitted"),
    (2, "PG", "Parental guidance suggested"),
    (3, "PG-13", "Parents strongly cautioned, some material may be inappropriate under 13"),
    (4, "R", "Restricted, under 17 requires accompanying adult"),
    (5, "NC-17", "Adults only"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert_genres = Query::insert()
            .into_table(Genres::Table)
            .columns([Genres::Id, Genres::Name])
            .to_owned();
        for (id, name) in GENRES {
            insert_genres.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(insert_genres).await?;

        let mut insert_ratings = Query::insert()
            .into_table(Ratings::Table)
            .columns([Ratings::Id, Ratings::Name, Ratings::Description])
            .to_owned();
        for (id, name, description) in RATINGS {
            insert_ratings.values_panic([id.into(), name.into(), description.into()]);
        }
        manager.exec_stmt(insert_ratings).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(Genres::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Ratings::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    Name,
    Description,
}
