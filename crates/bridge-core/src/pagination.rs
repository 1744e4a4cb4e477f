//! Page-token bookkeeping for List operations.
//!
//! Tokens are opaque UUID strings mapped to the offset of the next page. They
//! live only in process memory and are single-use: resolving a token removes
//! it, so abandoned listings are the only ones that keep an entry.

use crate::config::PaginationConfig;
use crate::{BridgeError, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Resolved slice bounds for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub end: usize,
}

/// Issues and resolves page tokens.
#[derive(Debug, Default)]
pub struct Paginator {
    tokens: Mutex<HashMap<String, i32>>,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the requested page size and continuation token into a window.
    pub async fn page(&self, page_size: i32, page_token: &str) -> Result<PageWindow> {
        let size = match page_size {
            n if n < 0 => {
                return Err(BridgeError::invalid_argument(
                    "negative PageSize is not allowed",
                ))
            }
            0 => PaginationConfig::DEFAULT_PAGE_SIZE as i32,
            n => n.min(PaginationConfig::MAX_PAGE_SIZE as i32),
        };

        let offset = if page_token.is_empty() {
            0
        } else {
            self.tokens
                .lock()
                .await
                .remove(page_token)
                .ok_or_else(|| BridgeError::PageTokenNotFound {
                    token: page_token.to_string(),
                })?
        };

        let end = offset.checked_add(size).ok_or_else(|| {
            BridgeError::invalid_argument(format!(
                "pagination overflow: offset {} plus page size {}",
                offset, size
            ))
        })?;

        Ok(PageWindow {
            offset: offset as usize,
            end: end as usize,
        })
    }

    /// Cut `items` down to `window`, minting a token when more items remain.
    pub async fn limit_to_page<T: Clone>(&self, window: PageWindow, items: &[T]) -> (Vec<T>, String) {
        let len = items.len();
        if window.offset >= len {
            return (Vec::new(), String::new());
        }
        if window.end < len {
            let token = self.issue(window.end as i32).await;
            debug!("Limiting {} items to [{}:{}]", len, window.offset, window.end);
            return (items[window.offset..window.end].to_vec(), token);
        }
        (items[window.offset..].to_vec(), String::new())
    }

    /// Register a token resolving to `offset`.
    pub async fn issue(&self, offset: i32) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.tokens.lock().await.insert(token.clone(), offset);
        token
    }
}
