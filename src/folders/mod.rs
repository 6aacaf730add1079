//! Folder operations.

use tracing::{debug, info};

use crate::client::InstapaperClient;
use crate::error::{ErrorCode, InstapaperError};
use crate::model::{self, Folder};
use crate::transport::Method;

impl InstapaperClient {
    /// User-created folders, in the account's display order.
    pub async fn list_folders(&self) -> Result<Vec<Folder>, InstapaperError> {
        let items = self.send_items(Method::Post, "folders/list", &[]).await?;
        Ok(model::folders(items))
    }

    /// Folder whose title equals `title`, ignoring case.
    pub async fn find_folder(&self, title: &str) -> Result<Option<Folder>, InstapaperError> {
        let wanted = title.trim().to_lowercase();
        Ok(self
            .list_folders()
            .await?
            .into_iter()
            .find(|f| f.title.to_lowercase() == wanted))
    }

    pub async fn create_folder(&self, title: &str) -> Result<Folder, InstapaperError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(InstapaperError::InvalidArgument(
                "folder title must not be empty".to_string(),
            ));
        }

        let params = vec![("title".to_string(), title.to_string())];
        let items = self.send_items(Method::Post, "folders/add", &params).await?;
        let folder = model::folders(items)
            .into_iter()
            .next()
            .ok_or_else(|| InstapaperError::decode("folders/add", "response contained no folder"))?;

        info!(folder_id = folder.folder_id, "Folder created");
        Ok(folder)
    }

    /// Create `title`, or return the existing folder when the account already
    /// has one with that title.
    pub async fn ensure_folder(&self, title: &str) -> Result<Folder, InstapaperError> {
        match self.create_folder(title).await {
            Err(err) if err.code() == Some(ErrorCode::FolderAlreadyExists) => {
                debug!("Folder already exists, looking it up");
                self.find_folder(title).await?.ok_or(err)
            }
            other => other,
        }
    }

    /// Returns `true` when the response no longer lists the folder.
    pub async fn delete_folder(&self, folder_id: i64) -> Result<bool, InstapaperError> {
        let params = vec![("folder_id".to_string(), folder_id.to_string())];
        let items = self.send_items(Method::Post, "folders/delete", &params).await?;
        let deleted = model::folders(items).is_empty();
        info!(folder_id, deleted, "Folder delete requested");
        Ok(deleted)
    }

    /// Set folder positions; `order` pairs are `(folder_id, position)`.
    pub async fn reorder_folders(&self, order: &[(i64, i64)]) -> Result<Vec<Folder>, InstapaperError> {
        if order.is_empty() {
            return Err(InstapaperError::InvalidArgument(
                "folder order must not be empty".to_string(),
            ));
        }

        let order = order
            .iter()
            .map(|(id, position)| format!("{}:{}", id, position))
            .collect::<Vec<_>>()
            .join(",");
        let items = self
            .send_items(Method::Post, "folders/set_order", &[("order".to_string(), order)])
            .await?;
        Ok(model::folders(items))
    }
}
