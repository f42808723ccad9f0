//! Per-endpoint orchestration: authorization fan-out, input validation,
//! exactly one repository call, and outcome mapping.
//!
//! Mutations always run in the same order: validate the input shape, then
//! authorize the single capability the action needs, then touch the store.

pub mod error;
pub mod mutation;
pub mod page_view;

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::auth::{AuthorizationGate, Capability, Principal};
use crate::database::PageStore;
use crate::services::markdown::MarkdownRenderer;

pub use error::PipelineError;
pub use mutation::{ApiPage, DeleteForm, PageSummary, SaveForm};
pub use page_view::{IndexView, PageView, EMPTY_PAGE_MARKDOWN};

pub struct RequestPipeline {
    store: Arc<dyn PageStore>,
    gate: AuthorizationGate,
    renderer: Arc<dyn MarkdownRenderer>,
}

impl RequestPipeline {
    pub fn new(
        store: Arc<dyn PageStore>,
        gate: AuthorizationGate,
        renderer: Arc<dyn MarkdownRenderer>,
    ) -> Self {
        Self {
            store,
            gate,
            renderer,
        }
    }

    /// Single-capability check that ends the flow when not granted
    async fn authorize(&self, principal: &Principal, capability: Capability) -> Result<(), PipelineError> {
        let decision = self.gate.check(principal, capability).await;
        if decision.is_granted() {
            Ok(())
        } else {
            Err(PipelineError::Denied(decision.capability))
        }
    }
}

/// Parse a page id taken from a path or form field
pub fn parse_id(raw: &str) -> Result<i64, PipelineError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| PipelineError::validation(format!("invalid page id '{}'", raw)))
}

/// Everything but RFC 3986 unreserved characters
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a page name for use as one path segment
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
