/// Lesson plan shape returned by the model
use crate::{
    content::{NewLessonPlan, NewSection},
    error::{AppError, AppResult},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanDraft {
    pub topic: String,
    pub subtopic: String,
    pub duration: Duration,
    pub student_level: String,
    pub objective: String,
    pub sections: Vec<SectionDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionDraft {
    pub title: String,
    pub content: String,
    pub duration: Duration,
}

/// Duration as the model wrote it, either `45` or `"45 minutes"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Duration {
    Whole(i64),
    Text(String),
}

impl Duration {
    /// Minutes using leading-integer semantics
    pub fn minutes(&self) -> Option<i64> {
        match self {
            Duration::Whole(value) => Some(*value),
            Duration::Text(text) => leading_integer(text),
        }
    }
}

/// Parse the leading integer of a string: "45 minutes" is 45, "abc" is None
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}

/// Longest duration accepted for a lesson or a section (one day)
const MAX_MINUTES: i64 = 1440;

fn parse_minutes(duration: &Duration, field: &str) -> AppResult<i64> {
    let minutes = duration.minutes().ok_or_else(|| {
        AppError::Validation(format!("Invalid {} duration: {:?}", field, duration))
    })?;

    if minutes < 0 {
        return Err(AppError::Validation(format!(
            "{} duration cannot be negative",
            field
        )));
    }
    if minutes > MAX_MINUTES {
        return Err(AppError::Validation(format!(
            "{} duration of {} minutes exceeds {}",
            field, minutes, MAX_MINUTES
        )));
    }

    Ok(minutes)
}

impl LessonPlanDraft {
    /// Validate durations and bind the plan to its owner
    pub fn into_new_plan(self, user_id: &str) -> AppResult<NewLessonPlan> {
        let duration = parse_minutes(&self.duration, "lesson")?;

        let sections = self
            .sections
            .into_iter()
            .map(|section| {
                let duration = parse_minutes(&section.duration, "section")?;
                Ok(NewSection {
                    title: section.title,
                    content: section.content,
                    duration,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let total = sections
            .iter()
            .try_fold(0i64, |total, s| total.checked_add(s.duration))
            .ok_or_else(|| AppError::Validation("Section durations overflow".to_string()))?;
        if total > duration {
            tracing::warn!(
                user_id,
                lesson_duration = duration,
                section_total = total,
                "section durations exceed the lesson duration"
            );
        }

        Ok(NewLessonPlan {
            user_id: user_id.to_string(),
            topic: self.topic,
            subtopic: self.subtopic,
            duration,
            student_level: self.student_level,
            objective: self.objective,
            sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    const PLAN: &str = r#"{
        "topic": "Photosynthesis",
        "subtopic": "Light reactions",
        "duration": "45 minutes",
        "studentLevel": "Undergraduate",
        "objective": "Explain the electron transport chain",
        "sections": [
            {"title": "Warm-up", "content": "Recall", "duration": "10"},
            {"title": "Lecture", "content": "Thylakoids", "duration": 30}
        ]
    }"#;

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("45 minutes"), Some(45));
        assert_eq!(leading_integer("  12"), Some(12));
        assert_eq!(leading_integer("-3"), Some(-3));
        assert_eq!(leading_integer("about 10"), None);
        assert_eq!(leading_integer(""), None);
    }

    #[test]
    fn test_draft_into_new_plan() {
        let draft: LessonPlanDraft = normalize(PLAN).unwrap();
        let plan = draft.into_new_plan("user_a").unwrap();

        assert_eq!(plan.duration, 45);
        assert_eq!(plan.student_level, "Undergraduate");
        let durations: Vec<i64> = plan.sections.iter().map(|s| s.duration).collect();
        assert_eq!(durations, vec![10, 30]);
    }

    #[test]
    fn test_unparsable_section_duration_is_rejected() {
        let raw = PLAN.replace(r#""duration": "10""#, r#""duration": "ten""#);
        let draft: LessonPlanDraft = normalize(&raw).unwrap();

        assert!(matches!(
            draft.into_new_plan("user_a"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let raw = PLAN.replace(r#""duration": 30"#, r#""duration": -30"#);
        let draft: LessonPlanDraft = normalize(&raw).unwrap();

        assert!(draft.into_new_plan("user_a").is_err());
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let raw = PLAN
            .replace(r#""duration": "10""#, r#""duration": 9223372036854775807"#)
            .replace(r#""duration": 30"#, r#""duration": 9223372036854775807"#);
        let draft: LessonPlanDraft = normalize(&raw).unwrap();
        assert!(matches!(
            draft.into_new_plan("user_a"),
            Err(AppError::Validation(_))
        ));

        let raw = PLAN.replace(r#""duration": "45 minutes""#, r#""duration": "1441 minutes""#);
        let draft: LessonPlanDraft = normalize(&raw).unwrap();
        assert!(matches!(
            draft.into_new_plan("user_a"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_full_day_is_accepted() {
        let raw = PLAN.replace(r#""duration": "45 minutes""#, r#""duration": 1440"#);
        let draft: LessonPlanDraft = normalize(&raw).unwrap();
        assert_eq!(draft.into_new_plan("user_a").unwrap().duration, 1440);
    }

    #[test]
    fn test_missing_sections_is_unparsable() {
        let raw = r#"{"topic": "x", "subtopic": "y", "duration": "5", "studentLevel": "z", "objective": "w"}"#;
        assert!(matches!(
            normalize::<LessonPlanDraft>(raw),
            Err(AppError::UnparsableResponse)
        ));
    }
}
