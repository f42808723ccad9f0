//! In-process fakes for the pipeline's collaborators, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{AuthError, AuthProvider, Capability, Credentials, Principal};
use crate::database::{DatabaseError, Page, PageLookup, PageStore};

/// Provider whose answer per capability is fixed up front
#[derive(Default)]
pub struct ScriptedProvider {
    answers: HashMap<String, Script>,
    calls: AtomicUsize,
}

#[derive(Debug, Clone, Copy)]
pub enum Script {
    Grant,
    Deny,
    Fail,
    Hang,
}

impl ScriptedProvider {
    pub fn with(mut self, capability: &str, script: Script) -> Self {
        self.answers.insert(capability.to_string(), script);
        self
    }

    /// Grants create, update, delete and the writer role
    pub fn granting_all() -> Self {
        Self::default()
            .with("create", Script::Grant)
            .with("update", Script::Grant)
            .with("delete", Script::Grant)
            .with("role:writer", Script::Grant)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for ScriptedProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        Ok(Principal::new(credentials.username.clone()))
    }

    async fn is_authorized(
        &self,
        _principal: &Principal,
        capability: &Capability,
    ) -> Result<bool, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(&capability.to_string()).copied().unwrap_or(Script::Deny) {
            Script::Grant => Ok(true),
            Script::Deny => Ok(false),
            Script::Fail => Err(AuthError::Unavailable("scripted failure".to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(true)
            }
        }
    }
}

/// Vec-backed store that records every call and can be told to fail
#[derive(Default)]
pub struct MemoryStore {
    pages: Mutex<Vec<Page>>,
    next_id: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut stored = store.pages.lock().unwrap();
            for (name, content) in pages {
                let id = store.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                stored.push(Page {
                    id,
                    name: name.to_string(),
                    content: content.to_string(),
                });
            }
        }
        store
    }

    pub fn fail_statements(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pages(&self) -> Vec<Page> {
        self.pages.lock().unwrap().clone()
    }

    fn enter(&self, operation: &'static str) -> Result<(), DatabaseError> {
        self.calls.lock().unwrap().push(operation);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DatabaseError::Sqlx(sqlx::Error::Protocol(format!(
                "{} failed",
                operation
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn fetch_all_pages(&self) -> Result<Vec<String>, DatabaseError> {
        self.enter("fetch_all_pages")?;
        let mut names: Vec<String> = self.pages().into_iter().map(|p| p.name).collect();
        names.sort();
        Ok(names)
    }

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, DatabaseError> {
        self.enter("fetch_page")?;
        Ok(self
            .pages()
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| PageLookup::found(p.id, p.content))
            .unwrap_or_else(PageLookup::missing))
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<Option<Page>, DatabaseError> {
        self.enter("fetch_page_by_id")?;
        Ok(self.pages().into_iter().find(|p| p.id == id))
    }

    async fn create_page(&self, name: &str, content: &str) -> Result<(), DatabaseError> {
        self.enter("create_page")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.pages.lock().unwrap().push(Page {
            id,
            name: name.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn save_page(&self, id: i64, content: &str) -> Result<(), DatabaseError> {
        self.enter("save_page")?;
        for page in self.pages.lock().unwrap().iter_mut().filter(|p| p.id == id) {
            page.content = content.to_string();
        }
        Ok(())
    }

    async fn delete_page(&self, id: i64) -> Result<(), DatabaseError> {
        self.enter("delete_page")?;
        self.pages.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }

    async fn fetch_all_pages_data(&self) -> Result<Vec<Page>, DatabaseError> {
        self.enter("fetch_all_pages_data")?;
        Ok(self.pages())
    }
}
