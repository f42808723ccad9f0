use async_trait::async_trait;
use tracing::{debug, info};

use crate::database::connection::{ConnectionSource, DatabaseError};
use crate::database::models::{Page, PageLookup};

/// The statements the page store is allowed to run. All of them are
/// parameterized; values are never spliced into the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlQuery {
    CreatePagesTable,
    AllPages,
    GetPage,
    GetPageById,
    CreatePage,
    SavePage,
    DeletePage,
    AllPagesData,
}

impl SqlQuery {
    pub fn sql(self) -> &'static str {
        match self {
            SqlQuery::CreatePagesTable => {
                "CREATE TABLE IF NOT EXISTS pages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    content TEXT NOT NULL
                )"
            }
            SqlQuery::AllPages => "SELECT name FROM pages",
            SqlQuery::GetPage => "SELECT id, content FROM pages WHERE name = ? ORDER BY id LIMIT 1",
            SqlQuery::GetPageById => "SELECT id, name, content FROM pages WHERE id = ?",
            SqlQuery::CreatePage => "INSERT INTO pages (name, content) VALUES (?, ?)",
            SqlQuery::SavePage => "UPDATE pages SET content = ? WHERE id = ?",
            SqlQuery::DeletePage => "DELETE FROM pages WHERE id = ?",
            SqlQuery::AllPagesData => "SELECT id, name, content FROM pages",
        }
    }
}

/// Page persistence as seen by the request pipeline
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Every page name, sorted lexicographically
    async fn fetch_all_pages(&self) -> Result<Vec<String>, DatabaseError>;

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, DatabaseError>;

    async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, DatabaseError>;

    async fn create_page(&self, name: &str, content: &str) -> Result<(), DatabaseError>;

    /// Overwrites the content of `id`; matching zero rows is not an error
    async fn save_page(&self, id: i64, content: &str) -> Result<(), DatabaseError>;

    /// Removes `id`; matching zero rows is not an error
    async fn delete_page(&self, id: i64) -> Result<(), DatabaseError>;

    /// Every stored row in storage order
    async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, DatabaseError>;
}

/// SQLite-backed [`PageStore`]. Holds no page state between calls; each
/// operation runs one statement on one short-lived connection.
#[derive(Clone)]
pub struct PageRepository {
    source: ConnectionSource,
}

impl PageRepository {
    pub fn new(source: ConnectionSource) -> Self {
        Self { source }
    }

    /// Create the `pages` table if it does not exist yet
    pub async fn init(&self) -> Result<(), DatabaseError> {
        self.source
            .with_write_connection(|conn| {
                Box::pin(async move {
                    sqlx::query(SqlQuery::CreatePagesTable.sql()).execute(conn).await?;
                    Ok(())
                })
            })
            .await?;

        info!("Pages table ready");
        Ok(())
    }

    pub fn source(&self) -> &ConnectionSource {
        &self.source
    }
}

#[async_trait]
impl PageStore for PageRepository {
    async fn fetch_all_pages(&self) -> Result<Vec<String>, DatabaseError> {
        let rows = self
            .source
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, (String,)>(SqlQuery::AllPages.sql())
                        .fetch_all(conn)
                        .await
                })
            })
            .await?;

        let mut names: Vec<String> = rows.into_iter().map(|(name,)| name).collect();
        names.sort();
        Ok(names)
    }

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, DatabaseError> {
        let name = name.to_string();
        let row = self
            .source
            .with_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, (i64, String)>(SqlQuery::GetPage.sql())
                        .bind(name)
                        .fetch_optional(conn)
                        .await
                })
            })
            .await?;

        Ok(match row {
            Some((id, content)) => PageLookup::found(id, content),
            None => PageLookup::missing(),
        })
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, DatabaseError> {
        self.source
            .with_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, Page>(SqlQuery::GetPageById.sql())
                        .bind(id)
                        .fetch_optional(conn)
                        .await
                })
            })
            .await
    }

    async fn create_page(&self, name: &str, content: &str) -> Result<(), DatabaseError> {
        let (name, content) = (name.to_string(), content.to_string());
        let result = self
            .source
            .with_write_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query(SqlQuery::CreatePage.sql())
                        .bind(name)
                        .bind(content)
                        .execute(conn)
                        .await
                })
            })
            .await?;

        debug!("Created page row {}", result.last_insert_rowid());
        Ok(())
    }

    async fn save_page(&self, id: i64, content: &str) -> Result<(), DatabaseError> {
        let content = content.to_string();
        let result = self
            .source
            .with_write_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query(SqlQuery::SavePage.sql())
                        .bind(content)
                        .bind(id)
                        .execute(conn)
                        .await
                })
            })
            .await?;

        debug!("Saved page {} ({} rows)", id, result.rows_affected());
        Ok(())
    }

    async fn delete_page(&self, id: i64) -> Result<(), DatabaseError> {
        let result = self
            .source
            .with_write_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query(SqlQuery::DeletePage.sql())
                        .bind(id)
                        .execute(conn)
                        .await
                })
            })
            .await?;

        debug!("Deleted page {} ({} rows)", id, result.rows_affected());
        Ok(())
    }

    async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, DatabaseError> {
        self.source
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, Page>(SqlQuery::AllPagesData.sql())
                        .fetch_all(conn)
                        .await
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use tempfile::TempDir;

    async fn repository(dir: &TempDir) -> PageRepository {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("pages.db").display()),
            max_connections: 4,
            connection_timeout: 5,
            statement_timeout_ms: 2_000,
        };
        let source = ConnectionSource::connect(&config).await.unwrap();
        let repo = PageRepository::new(source);
        repo.init().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn crud_operations() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        repo.create_page("Test", "Some content").await.unwrap();

        let page = repo.fetch_page("Test").await.unwrap();
        assert!(page.found);
        assert_eq!(page.raw_content.as_deref(), Some("Some content"));
        let id = page.id.unwrap();

        repo.save_page(id, "Yo!").await.unwrap();
        assert_eq!(repo.fetch_all_pages().await.unwrap().len(), 1);

        let page = repo.fetch_page("Test").await.unwrap();
        assert_eq!(page.raw_content.as_deref(), Some("Yo!"));

        repo.delete_page(id).await.unwrap();
        assert!(repo.fetch_all_pages().await.unwrap().is_empty());
        assert_eq!(repo.source().stats().in_use, 0);
    }

    #[tokio::test]
    async fn missing_page_has_no_other_fields() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        let lookup = repo.fetch_page("Nowhere").await.unwrap();
        assert_eq!(lookup, PageLookup::missing());
        assert_eq!(serde_json::to_value(&lookup).unwrap(), serde_json::json!({ "found": false }));
    }

    #[tokio::test]
    async fn fetch_by_id_returns_last_written_state() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        assert_eq!(repo.fetch_page_by_id(42).await.unwrap(), None);

        repo.create_page("Home", "# Home").await.unwrap();
        let id = repo.fetch_page("Home").await.unwrap().id.unwrap();
        repo.save_page(id, "# Home, again").await.unwrap();

        let page = repo.fetch_page_by_id(id).await.unwrap().unwrap();
        assert_eq!(page.id, id);
        assert_eq!(page.name, "Home");
        assert_eq!(page.content, "# Home, again");
    }

    #[tokio::test]
    async fn mutations_on_unknown_ids_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        repo.save_page(999, "ghost").await.unwrap();
        repo.delete_page(999).await.unwrap();
        assert!(repo.fetch_all_pages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_reflects_mutation_sequence_sorted() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        for name in ["zeta", "Alpha", "mu", "beta"] {
            repo.create_page(name, "body").await.unwrap();
        }
        let mu = repo.fetch_page("mu").await.unwrap().id.unwrap();
        repo.delete_page(mu).await.unwrap();
        let zeta = repo.fetch_page("zeta").await.unwrap().id.unwrap();
        repo.save_page(zeta, "changed").await.unwrap();

        assert_eq!(repo.fetch_all_pages().await.unwrap(), vec!["Alpha", "beta", "zeta"]);

        let rows = repo.fetch_all_pages_data().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|p| p.name == "zeta" && p.content == "changed"));
    }

    #[tokio::test]
    async fn names_are_not_unique() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        repo.create_page("Dup", "first").await.unwrap();
        repo.create_page("Dup", "second").await.unwrap();

        // Lookup by name settles on the oldest row
        let lookup = repo.fetch_page("Dup").await.unwrap();
        assert_eq!(lookup.raw_content.as_deref(), Some("first"));
        assert_eq!(repo.fetch_all_pages().await.unwrap(), vec!["Dup", "Dup"]);
    }

    #[tokio::test]
    async fn failing_statements_do_not_leak_connections() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        repo.create_page("Keep", "me").await.unwrap();

        repo.source()
            .with_connection(|conn| {
                Box::pin(async move {
                    sqlx::query("DROP TABLE pages").execute(conn).await?;
                    Ok(())
                })
            })
            .await
            .unwrap();

        assert!(repo.fetch_all_pages().await.is_err());
        assert!(repo.fetch_page("Keep").await.is_err());
        assert!(repo.create_page("New", "page").await.is_err());
        assert!(repo.save_page(1, "x").await.is_err());
        assert!(repo.delete_page(1).await.is_err());
        assert_eq!(repo.source().stats().in_use, 0);

        repo.init().await.unwrap();
        assert!(repo.fetch_all_pages().await.unwrap().is_empty());
        assert_eq!(repo.source().stats().in_use, 0);
    }
}
