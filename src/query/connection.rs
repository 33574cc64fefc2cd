//! Relay-style connection wire types for cursor-paginated list operations.
//!
//! The cursor token is opaque, server-issued, and only ever handed back as
//! the `after` argument of the next page request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge<T> {
    pub node: T,
    pub cursor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total_count: u64,
}

impl<T> Connection<T> {
    pub fn nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }
}

/// Pagination position owned by the merger; never constructed by the UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageCursor {
    pub token: Option<String>,
    pub has_next_page: bool,
}

impl PageCursor {
    pub fn from_page_info(info: &PageInfo) -> Self {
        Self {
            token: info.end_cursor.clone(),
            has_next_page: info.has_next_page,
        }
    }
}
