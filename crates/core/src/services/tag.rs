//! Tag service.

use hasker_common::{AppError, AppResult, IdGenerator};
use hasker_db::{entities::tag, repositories::TagRepository};
use sea_orm::ConnectionTrait;
use tracing::debug;

/// Maximum length of a tag title, in characters.
pub const MAX_TAG_LENGTH: usize = 15;

/// Split a whitespace-separated tag string into unique titles, keeping the
/// order of first appearance.
pub fn parse_tags(raw: &str, max_tags: usize) -> AppResult<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();

    for title in raw.split_whitespace() {
        if title.chars().count() > MAX_TAG_LENGTH {
            return Err(AppError::Validation(format!(
                "Tag '{title}' is longer than {MAX_TAG_LENGTH} characters"
            )));
        }
        if !tags.iter().any(|t| t == title) {
            tags.push(title.to_string());
        }
    }

    if tags.len() > max_tags {
        return Err(AppError::Validation(format!(
            "You can only provide up to {max_tags} tags"
        )));
    }

    Ok(tags)
}

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    id_gen: IdGenerator,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self {
            tag_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a tag by its exact title.
    pub async fn get_by_title(&self, title: &str) -> AppResult<tag::Model> {
        self.tag_repo
            .find_by_title(title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag: {title}")))
    }

    /// Get the tags of a question.
    pub async fn tags_of(&self, question_id: &str) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_by_question(question_id).await
    }

    /// Link `titles` to a question, reusing existing tags and creating the
    /// missing ones.
    pub async fn save_tags_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        question_id: &str,
        titles: &[String],
    ) -> AppResult<Vec<tag::Model>> {
        if titles.is_empty() {
            return Ok(vec![]);
        }

        let existing = TagRepository::find_by_titles_in(conn, titles).await?;
        let missing: Vec<&String> = titles
            .iter()
            .filter(|title| !existing.iter().any(|t| &t.title == *title))
            .collect();

        let tags = if missing.is_empty() {
            existing
        } else {
            for title in &missing {
                TagRepository::insert_if_missing_in(conn, self.id_gen.generate(), title).await?;
            }
            TagRepository::find_by_titles_in(conn, titles).await?
        };

        let tag_ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        TagRepository::link_in(conn, question_id, &tag_ids).await?;

        debug!(
            question_id = %question_id,
            tags = tags.len(),
            created = missing.len(),
            "Tags saved"
        );

        Ok(tags)
    }
}
