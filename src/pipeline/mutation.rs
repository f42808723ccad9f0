use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::{encode_path_segment, parse_id, PipelineError, RequestPipeline};
use crate::auth::{Capability, Principal};

/// Fields posted by the page editor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveForm {
    pub id: Option<String>,
    pub title: Option<String>,
    pub markdown: Option<String>,
    /// "yes" when the editor was opened on a page that does not exist
    #[serde(rename = "newPage")]
    pub new_page: Option<String>,
}

impl SaveForm {
    pub fn is_new_page(&self) -> bool {
        self.new_page.as_deref() == Some("yes")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteForm {
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiPage {
    pub id: i64,
    pub name: String,
    pub markdown: String,
    pub html: String,
}

enum Edit {
    Create { title: String, markdown: String },
    Save { id: i64, title: String, markdown: String },
}

/// Fetch a string field from a JSON payload, trying each accepted spelling
fn payload_str<'a>(payload: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| payload.get(*name).and_then(Value::as_str))
}

/// Reject payloads that lack any of the required fields
fn require_fields<'a>(
    payload: &'a Value,
    required: &[&[&str]],
) -> Result<Vec<&'a str>, PipelineError> {
    if !payload.is_object() {
        error!("Bad page JSON payload (not an object): {}", payload);
        return Err(PipelineError::validation("expected a JSON object"));
    }

    let mut values = Vec::with_capacity(required.len());
    let mut missing = Vec::new();
    for names in required {
        match payload_str(payload, names) {
            Some(value) => values.push(value),
            None => missing.push(names[0]),
        }
    }

    if missing.is_empty() {
        Ok(values)
    } else {
        error!("Bad page JSON payload: {} (missing {})", payload, missing.join(", "));
        Err(PipelineError::validation(format!("missing {}", missing.join(", "))))
    }
}

const NAME: &[&str] = &["name"];
const CONTENT: &[&str] = &["content", "markdown"];

impl RequestPipeline {
    /// Editor submission. Creates the page when `newPage` is set, otherwise
    /// overwrites the content of `id`. Returns the redirect target.
    pub async fn save_from_form(&self, principal: &Principal, form: SaveForm) -> Result<String, PipelineError> {
        let edit = Self::validate_save_form(&form)?;

        let capability = match edit {
            Edit::Create { .. } => Capability::Create,
            Edit::Save { .. } => Capability::Update,
        };
        self.authorize(principal, capability).await?;

        let title = match edit {
            Edit::Create { title, markdown } => {
                self.store.create_page(&title, &markdown).await?;
                info!("'{}' created page '{}'", principal.username, title);
                title
            }
            Edit::Save { id, title, markdown } => {
                self.store.save_page(id, &markdown).await?;
                info!("'{}' saved page {} ('{}')", principal.username, id, title);
                title
            }
        };

        Ok(format!("/wiki/{}", encode_path_segment(&title)))
    }

    fn validate_save_form(form: &SaveForm) -> Result<Edit, PipelineError> {
        let title = form
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::validation("missing title"))?
            .to_string();
        let markdown = form
            .markdown
            .clone()
            .ok_or_else(|| PipelineError::validation("missing markdown"))?;

        if form.is_new_page() {
            Ok(Edit::Create { title, markdown })
        } else {
            let raw = form
                .id
                .as_deref()
                .ok_or_else(|| PipelineError::validation("missing id"))?;
            Ok(Edit::Save {
                id: parse_id(raw)?,
                title,
                markdown,
            })
        }
    }

    /// Delete button. Returns the redirect target.
    pub async fn delete_from_form(&self, principal: &Principal, form: DeleteForm) -> Result<String, PipelineError> {
        let raw = form
            .id
            .as_deref()
            .ok_or_else(|| PipelineError::validation("missing id"))?;
        let id = parse_id(raw)?;

        self.authorize(principal, Capability::Delete).await?;
        self.store.delete_page(id).await?;
        info!("'{}' deleted page {}", principal.username, id);

        Ok("/".to_string())
    }

    /// "New page" box: only computes where the editor lives, nothing is stored
    pub fn create_redirect(&self, name: Option<&str>) -> String {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("/wiki/{}", encode_path_segment(name)),
            None => "/".to_string(),
        }
    }

    pub async fn api_list(&self) -> Result<Vec<PageSummary>, PipelineError> {
        let pages = self.store.fetch_all_pages_data().await?;
        Ok(pages
            .into_iter()
            .map(|p| PageSummary {
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    pub async fn api_get(&self, id: i64) -> Result<ApiPage, PipelineError> {
        let page = self
            .store
            .fetch_page_by_id(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("There is no page with ID {}", id)))?;

        let html = self.renderer.render(&page.content);
        Ok(ApiPage {
            id: page.id,
            name: page.name,
            markdown: page.content,
            html,
        })
    }

    pub async fn api_create(&self, principal: &Principal, payload: &Value) -> Result<(), PipelineError> {
        let fields = require_fields(payload, &[NAME, CONTENT])?;
        let (name, content) = (fields[0], fields[1]);

        self.authorize(principal, Capability::Create).await?;
        self.store.create_page(name, content).await?;
        info!("'{}' created page '{}' via API", principal.username, name);
        Ok(())
    }

    pub async fn api_update(&self, principal: &Principal, id: i64, payload: &Value) -> Result<(), PipelineError> {
        let fields = require_fields(payload, &[CONTENT])?;

        self.authorize(principal, Capability::Update).await?;
        self.store.save_page(id, fields[0]).await?;
        info!("'{}' saved page {} via API", principal.username, id);
        Ok(())
    }

    pub async fn api_delete(&self, principal: &Principal, id: i64) -> Result<(), PipelineError> {
        self.authorize(principal, Capability::Delete).await?;
        self.store.delete_page(id).await?;
        info!("'{}' deleted page {} via API", principal.username, id);
        Ok(())
    }
}
