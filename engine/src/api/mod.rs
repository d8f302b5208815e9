//! Access to the remote policy and directory APIs.

pub mod http;
pub mod wire;

pub use http::HttpPolicyBackend;

use crate::error::PolicyError;
use crate::model::{InheritRequest, ModifyRequest};
use async_trait::async_trait;
use std::future::Future;
use tracing::debug;
use wire::{OrgUnitRecord, ResolvedPolicyRecord, SchemaRecord};

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

/// Calls the console makes against the policy service.
///
/// The HTTP implementation is [`HttpPolicyBackend`]; tests substitute in-memory fakes.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    async fn list_schemas(
        &self,
        namespace: &str,
        page_token: Option<&str>,
    ) -> Result<Page<SchemaRecord>, PolicyError>;

    /// `schema_filter` is sent verbatim, e.g. `chrome.users.*`.
    async fn resolve(
        &self,
        target_resource: &str,
        schema_filter: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ResolvedPolicyRecord>, PolicyError>;

    async fn list_org_units(&self) -> Result<Vec<OrgUnitRecord>, PolicyError>;

    async fn batch_modify(&self, requests: &[ModifyRequest]) -> Result<(), PolicyError>;

    async fn batch_inherit(&self, requests: &[InheritRequest]) -> Result<(), PolicyError>;
}

/// Follow continuation tokens until a page arrives without one.
///
/// Pages are requested strictly one after another. Any failure aborts the
/// whole listing; a partial result is never returned.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, PolicyError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, PolicyError>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(token.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_page_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    debug!(pages, items = items.len(), "pagination complete");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_collect_pages_follows_tokens_in_order() {
        let requested = Mutex::new(Vec::new());

        let items = collect_pages(|token: Option<String>| {
            requested.lock().unwrap().push(token.clone());
            async move {
                match token.as_deref() {
                    None => Ok(Page {
                        items: vec![1, 2],
                        next_page_token: Some("abc".to_string()),
                    }),
                    Some("abc") => Ok(Page::last(vec![3])),
                    Some(other) => panic!("unexpected token {}", other),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(
            *requested.lock().unwrap(),
            vec![None, Some("abc".to_string())]
        );
    }

    #[tokio::test]
    async fn test_collect_pages_treats_empty_token_as_end() {
        let items = collect_pages(|_token| async {
            Ok(Page {
                items: vec!["only"],
                next_page_token: Some(String::new()),
            })
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["only"]);
    }

    #[tokio::test]
    async fn test_collect_pages_fails_on_mid_pagination_error() {
        let result: Result<Vec<u8>, _> = collect_pages(|token: Option<String>| async move {
            match token {
                None => Ok(Page {
                    items: vec![1],
                    next_page_token: Some("next".to_string()),
                }),
                Some(_) => Err(PolicyError::Transport {
                    status: Some(503),
                    message: "backend unavailable".to_string(),
                }),
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(PolicyError::Transport {
                status: Some(503),
                ..
            })
        ));
    }
}
