//! Create question table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Question::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Question::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Question::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Question::Content).text().not_null())
                    .col(
                        ColumnDef::new(Question::Status)
                            .small_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Question::Status).is_in([0, 1])),
                    )
                    .col(ColumnDef::new(Question::Score).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Question::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_author")
                            .from(Question::Table, Question::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: title
        manager
            .create_index(
                Index::create()
                    .name("idx_question_title")
                    .table(Question::Table)
                    .col(Question::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: author_id
        manager
            .create_index(
                Index::create()
                    .name("idx_question_author_id")
                    .table(Question::Table)
                    .col(Question::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: score (for trending)
        manager
            .create_index(
                Index::create()
                    .name("idx_question_score")
                    .table(Question::Table)
                    .col(Question::Score)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Question::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
    Title,
    AuthorId,
    Content,
    Status,
    Score,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
