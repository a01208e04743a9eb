//! Create tag and `question_tag` tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tag::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Tag::Title).string_len(15).not_null())
                    .to_owned(),
            )
            .await?;

        // Unique index: title
        manager
            .create_index(
                Index::create()
                    .name("idx_tag_title")
                    .table(Tag::Table)
                    .col(Tag::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuestionTag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(QuestionTag::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(QuestionTag::TagId).string_len(32).not_null())
                    .primary_key(
                        Index::create()
                            .col(QuestionTag::QuestionId)
                            .col(QuestionTag::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_tag_question")
                            .from(QuestionTag::Table, QuestionTag::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_tag_tag")
                            .from(QuestionTag::Table, QuestionTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: tag_id (for listing questions by tag)
        manager
            .create_index(
                Index::create()
                    .name("idx_question_tag_tag_id")
                    .table(QuestionTag::Table)
                    .col(QuestionTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuestionTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
    Title,
}

#[derive(Iden)]
enum QuestionTag {
    Table,
    QuestionId,
    TagId,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
}
