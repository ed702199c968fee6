//! Blog post CRUD. Content is markdown stored as-is.

use crate::{
    db::is_unique_violation,
    models::blog::{BlogPost, BlogPostRow, BlogQuery, CreateBlogPost, UpdateBlogPost},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("post `{0}` not found")]
    NotFound(String),
    #[error("slug `{0}` is already in use")]
    SlugTaken(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type BlogResult<T> = Result<T, BlogError>;

const POST_COLUMNS: &str =
    "id, title, slug, excerpt, content, author, tags, published, created_at, updated_at";

#[derive(Clone)]
pub struct BlogService {
    pub db: Arc<SqlitePool>,
}

/// Lowercase, ASCII alphanumerics separated by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn clean_slug(raw: &str) -> BlogResult<String> {
    let slug = slugify(raw);
    if slug.is_empty() {
        return Err(BlogError::Invalid("slug must contain letters or digits".into()));
    }
    Ok(slug)
}

fn tags_json(tags: &[String]) -> String {
    let cleaned: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    serde_json::to_string(&cleaned).unwrap_or_else(|_| "[]".into())
}

impl BlogService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &BlogQuery) -> BlogResult<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {} FROM blog_posts {} ORDER BY created_at DESC",
            POST_COLUMNS,
            if query.all { "" } else { "WHERE published = 1" }
        );
        let rows = sqlx::query_as::<_, BlogPostRow>(&sql)
            .fetch_all(&*self.db)
            .await?;

        let tag = query.tag.as_deref().map(|t| t.trim().to_lowercase());
        Ok(rows
            .into_iter()
            .map(BlogPost::from)
            .filter(|post| tag.as_ref().is_none_or(|t| post.tags.contains(t)))
            .collect())
    }

    /// Look up by id, falling back to slug.
    pub async fn get(&self, id_or_slug: &str) -> BlogResult<BlogPost> {
        sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {} FROM blog_posts WHERE id = ? OR slug = ? LIMIT 1",
            POST_COLUMNS
        ))
        .bind(id_or_slug)
        .bind(id_or_slug)
        .fetch_optional(&*self.db)
        .await?
        .map(BlogPost::from)
        .ok_or_else(|| BlogError::NotFound(id_or_slug.to_string()))
    }

    pub async fn create(&self, req: CreateBlogPost) -> BlogResult<BlogPost> {
        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(BlogError::Invalid("title is required".into()));
        }
        if req.content.trim().is_empty() {
            return Err(BlogError::Invalid("content is required".into()));
        }
        let slug = clean_slug(req.slug.as_deref().unwrap_or(&title))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO blog_posts (id, title, slug, excerpt, content, author, tags, published, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&title)
        .bind(&slug)
        .bind(&req.excerpt)
        .bind(&req.content)
        .bind(&req.author)
        .bind(tags_json(&req.tags))
        .bind(req.published)
        .bind(now)
        .bind(now)
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => {
                info!(post_id = %id, slug = %slug, "blog post created");
                self.get(&id).await
            }
            Err(err) if is_unique_violation(&err) => Err(BlogError::SlugTaken(slug)),
            Err(err) => Err(BlogError::Sqlx(err)),
        }
    }

    pub async fn update(&self, id: &str, req: UpdateBlogPost) -> BlogResult<BlogPost> {
        let mut post = self.get(id).await?;

        if let Some(title) = req.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(BlogError::Invalid("title is required".into()));
            }
            post.title = title;
        }
        if let Some(slug) = req.slug {
            post.slug = clean_slug(&slug)?;
        }
        if req.excerpt.is_some() {
            post.excerpt = req.excerpt;
        }
        if let Some(content) = req.content {
            post.content = content;
        }
        if req.author.is_some() {
            post.author = req.author;
        }
        if let Some(tags) = req.tags {
            post.tags = tags;
        }
        if let Some(published) = req.published {
            post.published = published;
        }

        let result = sqlx::query(
            "UPDATE blog_posts SET title = ?, slug = ?, excerpt = ?, content = ?, author = ?,
                    tags = ?, published = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.author)
        .bind(tags_json(&post.tags))
        .bind(post.published)
        .bind(Utc::now())
        .bind(&post.id)
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => self.get(&post.id).await,
            Err(err) if is_unique_violation(&err) => Err(BlogError::SlugTaken(post.slug)),
            Err(err) => Err(BlogError::Sqlx(err)),
        }
    }

    pub async fn delete(&self, id: &str) -> BlogResult<()> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BlogError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    async fn service() -> BlogService {
        BlogService::new(Arc::new(connect_in_memory().await.unwrap()))
    }

    fn post(title: &str, published: bool) -> CreateBlogPost {
        CreateBlogPost {
            title: title.into(),
            slug: None,
            excerpt: None,
            content: "# Heading\n\nBody".into(),
            author: Some("Editor".into()),
            tags: vec!["Exams".into(), " ".into()],
            published,
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  GATE 2025: Tips & Tricks!  "), "gate-2025-tips-tricks");
        assert_eq!(slugify("***"), "");
    }

    #[tokio::test]
    async fn drafts_hidden_unless_all() {
        let svc = service().await;
        svc.create(post("Published one", true)).await.unwrap();
        svc.create(post("Draft one", false)).await.unwrap();

        assert_eq!(svc.list(&BlogQuery::default()).await.unwrap().len(), 1);
        assert_eq!(
            svc.list(&BlogQuery { all: true, tag: None }).await.unwrap().len(),
            2
        );
        let tagged = svc
            .list(&BlogQuery { all: true, tag: Some("EXAMS".into()) })
            .await
            .unwrap();
        assert_eq!(tagged.len(), 2);
        assert_eq!(tagged[0].tags, vec!["exams".to_string()]);
    }

    #[tokio::test]
    async fn slug_conflicts_and_lookup() {
        let svc = service().await;
        let first = svc.create(post("Same Title", true)).await.unwrap();
        assert_eq!(first.slug, "same-title");
        assert!(matches!(
            svc.create(post("Same Title", true)).await.unwrap_err(),
            BlogError::SlugTaken(_)
        ));
        assert_eq!(svc.get("same-title").await.unwrap().id, first.id);

        let updated = svc
            .update(&first.id, UpdateBlogPost { published: Some(false), ..Default::default() })
            .await
            .unwrap();
        assert!(!updated.published);

        svc.delete(&first.id).await.unwrap();
        assert!(matches!(svc.get(&first.id).await.unwrap_err(), BlogError::NotFound(_)));
    }
}
