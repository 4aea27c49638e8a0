/// Generated content and lesson plan records
mod manager;

pub use manager::{insert_generated_content, insert_lesson_plan, ContentManager};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Separator between thread segments in a stored record
pub const SEGMENT_SEPARATOR: &str = "\n\n";

/// Social content kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Twitter,
    Instagram,
    #[serde(rename = "linkedin")]
    LinkedIn,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Twitter => "twitter",
            ContentType::Instagram => "instagram",
            ContentType::LinkedIn => "linkedin",
        }
    }

    /// Whether the output is a thread of separate segments
    pub fn is_segmented(&self) -> bool {
        matches!(self, ContentType::Twitter)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" => Ok(ContentType::Twitter),
            "instagram" => Ok(ContentType::Instagram),
            "linkedin" => Ok(ContentType::LinkedIn),
            other => Err(format!("Unsupported content type: {}", other)),
        }
    }
}

/// Stored social content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub id: i64,
    pub user_id: String,
    pub content_type: ContentType,
    pub prompt: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedContent {
    /// Stored text split back into its segments; single posts stay whole
    pub fn segments(&self) -> Vec<String> {
        if !self.content_type.is_segmented() {
            return vec![self.content.clone()];
        }
        self.content
            .split(SEGMENT_SEPARATOR)
            .filter(|segment| !segment.trim().is_empty())
            .map(String::from)
            .collect()
    }
}

/// History item as rendered: the record plus its display segments
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: GeneratedContent,
    pub segments: Vec<String>,
}

impl From<GeneratedContent> for HistoryEntry {
    fn from(record: GeneratedContent) -> Self {
        let segments = record.segments();
        Self { record, segments }
    }
}

/// Stored lesson plan with ordered sections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub subject: String,
    pub topic: String,
    pub subtopic: String,
    pub duration: i64,
    pub student_level: String,
    pub objective: String,
    pub created_at: DateTime<Utc>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i64,
    pub lesson_plan_id: String,
    pub position: i64,
    pub title: String,
    pub content: String,
    pub duration: i64,
}

/// Validated lesson plan ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewLessonPlan {
    pub user_id: String,
    pub topic: String,
    pub subtopic: String,
    pub duration: i64,
    pub student_level: String,
    pub objective: String,
    pub sections: Vec<NewSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSection {
    pub title: String,
    pub content: String,
    pub duration: i64,
}

/// Lesson plan form submitted by a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanInput {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(min = 1, max = 200))]
    pub subtopic: String,
    /// Total duration in minutes
    #[validate(range(min = 1, max = 1440))]
    pub duration: u32,
    #[validate(length(min = 1, max = 100))]
    pub student_level: String,
    #[validate(length(min = 1, max = 2000))]
    pub objective: String,
}
