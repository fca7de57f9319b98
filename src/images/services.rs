use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;
use crate::storage::UploadFile;

/// Uploads a required image and returns the public id to store.
pub async fn upload_image(st: &AppState, file: Option<UploadFile>) -> Result<String, AppError> {
    let Some(file) = file else {
        return Err(AppError::Upload(anyhow::anyhow!("no image provided")));
    };
    let opts = st.config.media.upload_options();
    let filename = file.filename.clone();
    let asset = st.media.upload(file, &opts).await.map_err(|e| {
        debug!(%filename, "media upload failed");
        AppError::Upload(e)
    })?;
    debug!(public_id = %asset.public_id, %filename, "image uploaded");
    Ok(asset.public_id)
}
