/// AI generation client
///
/// Builds prompts, attaches images as inline data, sends a single
/// `generateContent` request and extracts the first candidate's text.
/// No retries are attempted.
pub mod gemini;
pub mod prompts;

use crate::{
    config::AiConfig,
    content::{ContentType, LessonPlanInput},
    error::{AppError, AppResult},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    GenerativeContentBlob, GenerativeModel, InlineDataPart, Part, Role, TextPart,
};
use std::sync::Arc;

/// Image uploaded alongside a content prompt
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Generation client over a pluggable model transport
pub struct AiClient {
    model: Arc<dyn GenerativeModel>,
    config: AiConfig,
}

impl AiClient {
    pub fn new(model: Arc<dyn GenerativeModel>, config: AiConfig) -> Self {
        Self { model, config }
    }

    /// Generate social content, returning the raw candidate text
    pub async fn generate(
        &self,
        content_type: ContentType,
        prompt: &str,
        image: Option<&ImageInput>,
    ) -> AppResult<String> {
        let mut parts = vec![Part::TextPart(TextPart {
            text: prompts::content_prompt(content_type, prompt, image.is_some()),
        })];

        if let Some(image) = image {
            parts.push(Part::InlineDataPart(InlineDataPart {
                inline_data: GenerativeContentBlob {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                },
            }));
        }

        tracing::debug!(
            content_type = %content_type,
            with_image = image.is_some(),
            "generating content"
        );

        let request = self.request(parts);
        let response = self
            .model
            .generate_content(&self.config.content_model, &request)
            .await?;

        extract_candidate_text(response)
    }

    /// Generate a lesson plan, returning the raw candidate text
    pub async fn generate_lesson_plan(&self, input: &LessonPlanInput) -> AppResult<String> {
        let parts = vec![Part::TextPart(TextPart {
            text: prompts::lesson_plan_prompt(input),
        })];

        tracing::debug!(topic = %input.topic, "generating lesson plan");

        let request = self.request(parts);
        let response = self
            .model
            .generate_content(&self.config.lesson_plan_model, &request)
            .await?;

        extract_candidate_text(response)
    }

    fn request(&self, parts: Vec<Part>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts,
                role: Some(Role::User),
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(self.config.max_output_tokens),
                temperature: Some(self.config.temperature),
                top_p: Some(self.config.top_p),
                top_k: Some(self.config.top_k),
            }),
            safety_settings: Some(self.config.safety_settings.clone()),
        }
    }
}

/// Concatenated text parts of the first candidate
pub fn extract_candidate_text(response: GenerateContentResponse) -> AppResult<String> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            tracing::warn!(reason = %reason, "prompt was blocked by the provider");
        }
    }

    let content = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .ok_or(AppError::EmptyResponse)?;

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| match part {
            Part::TextPart(part) => Some(part.text),
            Part::InlineDataPart(_) => None,
        })
        .collect();

    if text.trim().is_empty() {
        return Err(AppError::EmptyResponse);
    }

    Ok(text)
}
