use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use tracing::warn;

use crate::error::AppError;
use crate::storage::UploadFile;

/// Text fields and the (single) uploaded file of a multipart request.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    file: Option<UploadFile>,
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state).await.map_err(|e| {
            warn!(error = %e, "not a multipart request");
            AppError::Validation("\"body\" must be multipart/form-data".into())
        })?;
        Self::read(mp).await
    }
}

impl FormData {
    pub async fn read(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();
        loop {
            let field = match mp.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "malformed multipart body");
                    return Err(AppError::Validation("invalid multipart body".into()));
                }
            };
            let name = field.name().unwrap_or_default().to_string();

            if let Some(filename) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::Validation(format!("\"{}\" could not be read", name)))?;
                // browsers send an empty part for an untouched file input
                if filename.is_empty() && body.is_empty() {
                    continue;
                }
                if form.file.is_none() {
                    form.file = Some(UploadFile {
                        filename,
                        content_type,
                        body,
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::Validation(format!("\"{}\" could not be read", name)))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn required_text(&self, name: &str) -> Result<String, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::Validation(format!("\"{}\" is required", name)))
    }

    pub fn number(&self, name: &str) -> Result<Option<i32>, AppError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("\"{}\" must be a number", name))),
        }
    }

    pub fn required_number(&self, name: &str) -> Result<i32, AppError> {
        self.number(name)?
            .ok_or_else(|| AppError::Validation(format!("\"{}\" is required", name)))
    }

    pub fn take_file(&mut self) -> Option<UploadFile> {
        self.file.take()
    }
}
