//! Bookmark operations.

mod pagination;

pub use pagination::{
    collect_pages, effective_limit, fetch_ceiling, TitleFilter, DEFAULT_LIMIT, MAX_PAGES,
    PAGE_SIZE_CAP,
};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::client::InstapaperClient;
use crate::error::InstapaperError;
use crate::model::{self, Bookmark, BookmarkAction};
use crate::transport::Method;


/// Arguments for [`InstapaperClient::list_bookmarks`].
#[derive(Clone, Debug, Default)]
pub struct ListBookmarks {
    /// Case-insensitive title substring
    pub query: Option<String>,
    /// `unread`, `starred`, `archive` or a folder id; unread when absent
    pub folder: Option<String>,
    /// Maximum results; absent or non-positive means [`DEFAULT_LIMIT`]
    pub limit: Option<i64>,
}

/// Arguments for [`InstapaperClient::add_bookmark`].
#[derive(Clone, Debug)]
pub struct NewBookmark {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub folder_id: Option<i64>,
    /// Full HTML content; without a url the bookmark becomes a private note
    pub content: Option<String>,
    pub resolve_final_url: bool,
    pub archive_on_add: bool,
    pub tags: Vec<String>,
}

impl Default for NewBookmark {
    fn default() -> Self {
        Self {
            url: None,
            title: None,
            description: None,
            folder_id: None,
            content: None,
            resolve_final_url: true,
            archive_on_add: false,
            tags: Vec::new(),
        }
    }
}

impl NewBookmark {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn note(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Form parameters for `bookmarks/add`.
    pub(crate) fn to_params(&self) -> Result<Vec<(String, String)>, InstapaperError> {
        let url = self.url.as_deref().filter(|u| !u.trim().is_empty());
        let content = self.content.as_deref().filter(|c| !c.trim().is_empty());

        if url.is_none() && content.is_none() {
            return Err(InstapaperError::InvalidArgument(
                "either url or content is required".to_string(),
            ));
        }

        let mut params = Vec::new();
        if let Some(url) = url {
            params.push(("url".to_string(), url.to_string()));
        }
        if let Some(title) = &self.title {
            params.push(("title".to_string(), title.clone()));
        }
        if let Some(description) = &self.description {
            params.push(("description".to_string(), description.clone()));
        }
        if let Some(folder_id) = self.folder_id {
            params.push(("folder_id".to_string(), folder_id.to_string()));
        }
        if let Some(content) = content {
            params.push(("content".to_string(), content.to_string()));
        }
        if !self.tags.is_empty() {
            let tags: Vec<serde_json::Value> = self
                .tags
                .iter()
                .map(|name| serde_json::json!({ "name": name }))
                .collect();
            params.push(("tags".to_string(), serde_json::Value::Array(tags).to_string()));
        }
        params.push(("resolve_final_url".to_string(), flag(self.resolve_final_url)));
        params.push(("archived".to_string(), flag(self.archive_on_add)));
        if url.is_none() {
            params.push(("is_private_from_source".to_string(), "note".to_string()));
        }

        Ok(params)
    }
}

fn flag(value: bool) -> String {
    let raw = if value { "1" } else { "0" };
    raw.to_string()
}

/// Result of [`InstapaperClient::manage_bookmark`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ManageOutcome {
    Updated(Bookmark),
    /// Delete answered with an empty array
    Deleted,
}

fn id_param(bookmark_id: i64) -> (String, String) {
    ("bookmark_id".to_string(), bookmark_id.to_string())
}

fn first_bookmark(path: &str, items: Vec<model::Item>) -> Result<Bookmark, InstapaperError> {
    model::bookmarks(items)
        .into_iter()
        .next()
        .ok_or_else(|| InstapaperError::decode(path, "response contained no bookmark"))
}

impl InstapaperClient {
    /// List bookmarks across pages with an optional title filter.
    pub async fn list_bookmarks(
        &self,
        request: &ListBookmarks,
    ) -> Result<Vec<Bookmark>, InstapaperError> {
        let limit = effective_limit(request.limit);
        let filter = TitleFilter::new(request.query.as_deref());
        let folder = request
            .folder
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());

        let results = collect_pages(limit, &filter, |page, have| {
            let mut params = Vec::with_capacity(3);
            if let Some(folder) = folder {
                params.push(("folder_id".to_string(), folder.to_string()));
            }
            params.push(("limit".to_string(), PAGE_SIZE_CAP.to_string()));
            if !have.is_empty() {
                params.push(("have".to_string(), have));
            }
            async move {
                debug!(page, "Requesting bookmark page");
                let items = self.send_items(Method::Post, "bookmarks/list", &params).await?;
                Ok::<_, InstapaperError>(model::bookmarks(items))
            }
        })
        .await?;

        info!(count = results.len(), limit, "Listed bookmarks");
        Ok(results)
    }

    /// Save a URL or a private note.
    pub async fn add_bookmark(&self, bookmark: &NewBookmark) -> Result<Bookmark, InstapaperError> {
        let params = bookmark.to_params()?;
        let items = self.send_items(Method::Post, "bookmarks/add", &params).await?;
        let added = first_bookmark("bookmarks/add", items)?;
        info!(bookmark_id = added.bookmark_id, "Bookmark added");
        Ok(added)
    }

    /// Processed article HTML for one bookmark.
    pub async fn bookmark_text(&self, bookmark_id: i64) -> Result<String, InstapaperError> {
        self.send_text(Method::Post, "bookmarks/get_text", &[id_param(bookmark_id)])
            .await
    }

    /// [`bookmark_text`](Self::bookmark_text) for many bookmarks, in input order.
    pub async fn bookmark_texts(
        &self,
        bookmark_ids: &[i64],
    ) -> Vec<(i64, Result<String, InstapaperError>)> {
        self.fan_out(bookmark_ids, |id| self.bookmark_text(id)).await
    }

    pub async fn manage_bookmark(
        &self,
        bookmark_id: i64,
        action: BookmarkAction,
    ) -> Result<ManageOutcome, InstapaperError> {
        let path = action.endpoint();
        let items = self.send_items(Method::Post, path, &[id_param(bookmark_id)]).await?;

        let outcome = match model::bookmarks(items).into_iter().next() {
            Some(bookmark) => ManageOutcome::Updated(bookmark),
            None if action == BookmarkAction::Delete => ManageOutcome::Deleted,
            None => return Err(InstapaperError::decode(path, "response contained no bookmark")),
        };

        info!(bookmark_id, action = ?action, "Bookmark updated");
        Ok(outcome)
    }

    pub async fn manage_bookmarks(
        &self,
        bookmark_ids: &[i64],
        action: BookmarkAction,
    ) -> Vec<(i64, Result<ManageOutcome, InstapaperError>)> {
        self.fan_out(bookmark_ids, |id| self.manage_bookmark(id, action))
            .await
    }

    /// Move a bookmark; the returned bookmark carries the target folder id.
    pub async fn move_bookmark(
        &self,
        bookmark_id: i64,
        folder_id: i64,
    ) -> Result<Bookmark, InstapaperError> {
        let params = vec![
            id_param(bookmark_id),
            ("folder_id".to_string(), folder_id.to_string()),
        ];
        let items = self.send_items(Method::Post, "bookmarks/move", &params).await?;
        let mut moved = first_bookmark("bookmarks/move", items)?;
        moved.folder_id = Some(folder_id);
        info!(bookmark_id, folder_id, "Bookmark moved");
        Ok(moved)
    }

    pub async fn move_bookmarks(
        &self,
        bookmark_ids: &[i64],
        folder_id: i64,
    ) -> Vec<(i64, Result<Bookmark, InstapaperError>)> {
        self.fan_out(bookmark_ids, |id| self.move_bookmark(id, folder_id))
            .await
    }

    /// One call per id, at most `batch_concurrency` in flight, output in
    /// input order. Failures are reported per item and do not stop the rest.
    pub(crate) async fn fan_out<T, F, Fut>(
        &self,
        ids: &[i64],
        call: F,
    ) -> Vec<(i64, Result<T, InstapaperError>)>
    where
        F: Fn(i64) -> Fut,
        Fut: std::future::Future<Output = Result<T, InstapaperError>>,
    {
        stream::iter(ids.iter().copied())
            .map(|id| {
                let fut = call(id);
                async move { (id, fut.await) }
            })
            .buffered(self.batch_concurrency())
            .collect()
            .await
    }
}
