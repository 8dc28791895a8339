use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::stream::StreamExt;

use crate::error::AppError;
use crate::models::UploadResponse;
use crate::state::AppState;

pub const FILE_FIELD: &str = "product";
pub const IMAGE_ROUTE: &str = "/images";

/// `product_<millis>_<random><ext>`, keeping the client's extension.
fn stored_name(field: &str, original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    format!(
        "{}_{}_{}{}",
        field,
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8],
        extension
    )
}

pub async fn upload_image(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::UploadFailure(e.to_string()))?;
        if field.name() != FILE_FIELD {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| AppError::UploadFailure(e.to_string()))?;
            }
            continue;
        }

        let filename = stored_name(
            FILE_FIELD,
            field.content_disposition().get_filename(),
        );
        let limit = state.max_upload_bytes;
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::UploadFailure(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                log::warn!("Rejected upload larger than {} bytes", limit);
                return Err(AppError::UploadFailure(format!(
                    "file exceeds the {limit} byte limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let dir = state.upload_dir.clone();
        let path = dir.join(&filename);
        web::block(move || {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, bytes)
        })
        .await
        .map_err(|e| AppError::UploadFailure(e.to_string()))?
        .map_err(|e| AppError::UploadFailure(e.to_string()))?;

        log::info!("Stored upload {}", filename);
        return Ok(HttpResponse::Ok().json(UploadResponse {
            success: 1,
            image_url: format!("{IMAGE_ROUTE}/{filename}"),
        }));
    }

    Err(AppError::UploadFailure(format!(
        "multipart field \"{FILE_FIELD}\" missing"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_keep_the_extension() {
        let name = stored_name("product", Some("photo.final.PNG"));
        assert!(name.starts_with("product_"));
        assert!(name.ends_with(".PNG"));
    }

    #[test]
    fn stored_names_without_extension() {
        let name = stored_name("product", None);
        assert!(!name.contains('.'));
        assert_ne!(name, stored_name("product", None));
    }
}
