/// Social content generation endpoint
use crate::{
    ai::ImageInput,
    auth::CurrentUser,
    context::AppContext,
    error::{AppError, AppResult},
    generation::{ContentGenerated, ContentRequest, GenerationOutcome, MAX_IMAGE_BYTES},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Router,
};

/// Build generation routes
pub fn routes() -> Router<AppContext> {
    Router::new().route(
        "/api/generate",
        post(generate).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
    )
}

/// Generate content from a multipart form: `contentType`, `prompt`, optional `image`
async fn generate(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
    multipart: Multipart,
) -> GenerationOutcome<ContentGenerated> {
    let request = match read_form(multipart).await {
        Ok(request) => request,
        Err(e) => return GenerationOutcome::from(Err::<ContentGenerated, _>(e)),
    };

    ctx.pipeline.generate_content(&identity, request).await
}

async fn read_form(mut multipart: Multipart) -> AppResult<ContentRequest> {
    let mut content_type = None;
    let mut prompt = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "contentType" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                content_type = Some(value.parse().map_err(AppError::Validation)?);
            }
            "prompt" => {
                prompt = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?,
                );
            }
            "image" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                // Browsers send an empty part when no file was chosen
                if !data.is_empty() {
                    image = Some(ImageInput {
                        mime_type,
                        data: data.to_vec(),
                    });
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(ContentRequest {
        content_type: content_type
            .ok_or_else(|| AppError::Validation("Missing contentType".to_string()))?,
        prompt: prompt.ok_or_else(|| AppError::Validation("Missing prompt".to_string()))?,
        image,
    })
}
