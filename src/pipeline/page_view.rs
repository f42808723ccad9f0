use chrono::Utc;
use serde::Serialize;

use super::{PipelineError, RequestPipeline};
use crate::auth::{Capability, Principal};

/// Body offered for a page that does not exist yet, so saving it creates it
pub const EMPTY_PAGE_MARKDOWN: &str = "# A new page\n\nFeel-free to write in Markdown!\n";

#[derive(Debug, Clone, Serialize)]
pub struct IndexView {
    pub title: String,
    pub pages: Vec<String>,
    #[serde(rename = "canCreatePage")]
    pub can_create_page: bool,
    pub username: String,
    #[serde(rename = "backupGistUrl", skip_serializing_if = "Option::is_none")]
    pub backup_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub title: String,
    /// -1 for a page that has not been created
    pub id: i64,
    #[serde(rename = "newPage")]
    pub new_page: bool,
    #[serde(rename = "rawContent")]
    pub raw_content: String,
    /// Rendered HTML, for display only
    pub content: String,
    pub timestamp: String,
    pub username: String,
    #[serde(rename = "canSavePage")]
    pub can_save_page: bool,
    #[serde(rename = "canDeletePage")]
    pub can_delete_page: bool,
}

impl RequestPipeline {
    /// Home page: page listing plus whether the caller may create pages.
    pub async fn index(&self, principal: &Principal) -> Result<IndexView, PipelineError> {
        let (create, pages) = tokio::join!(
            self.gate.check(principal, Capability::Create),
            self.store.fetch_all_pages(),
        );

        Ok(IndexView {
            title: "Wiki home".to_string(),
            pages: pages?,
            can_create_page: create.is_granted(),
            username: principal.username.clone(),
            backup_url: None,
        })
    }

    /// Page rendering: the `update` and `delete` checks and the fetch run
    /// concurrently and are all joined before anything is rendered. Only a
    /// store failure aborts; a failed check just withholds its capability.
    pub async fn view_page(&self, principal: &Principal, name: &str) -> Result<PageView, PipelineError> {
        let (update, delete, lookup) = tokio::join!(
            self.gate.check(principal, Capability::Update),
            self.gate.check(principal, Capability::Delete),
            self.store.fetch_page(name),
        );
        let lookup = lookup?;

        let raw_content = lookup
            .raw_content
            .unwrap_or_else(|| EMPTY_PAGE_MARKDOWN.to_string());
        let content = self.renderer.render(&raw_content);

        Ok(PageView {
            title: name.to_string(),
            id: lookup.id.unwrap_or(-1),
            new_page: !lookup.found,
            raw_content,
            content,
            timestamp: Utc::now().to_rfc2822(),
            username: principal.username.clone(),
            can_save_page: update.is_granted(),
            can_delete_page: delete.is_granted(),
        })
    }
}
