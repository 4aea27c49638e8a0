/// Content persistence: generated posts and lesson plans
use crate::{
    content::{ContentType, GeneratedContent, LessonPlan, NewLessonPlan, Section},
    error::{AppError, AppResult},
};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Content manager service
pub struct ContentManager {
    db: SqlitePool,
}

impl ContentManager {
    /// Create a new content manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Store a generated post
    pub async fn save_generated_content(
        &self,
        user_id: &str,
        content: &str,
        prompt: &str,
        content_type: ContentType,
    ) -> AppResult<GeneratedContent> {
        let mut conn = self.db.acquire().await?;
        insert_generated_content(&mut conn, user_id, content, prompt, content_type).await
    }

    /// A user's generated posts, most recent first
    pub async fn get_history(&self, user_id: &str) -> AppResult<Vec<GeneratedContent>> {
        let rows = sqlx::query(
            "SELECT id, user_id, content_type, prompt, content, created_at
             FROM generated_content
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(content_from_row).collect()
    }

    /// Store a lesson plan and its sections in one transaction
    pub async fn save_lesson_plan(&self, plan: &NewLessonPlan) -> AppResult<LessonPlan> {
        let mut tx = self.db.begin().await?;
        let stored = insert_lesson_plan(&mut tx, plan).await?;
        tx.commit().await?;
        Ok(stored)
    }

    /// A user's lesson plans with their sections, most recent first
    pub async fn list_lesson_plans(&self, user_id: &str) -> AppResult<Vec<LessonPlan>> {
        let plan_rows = sqlx::query(
            "SELECT id, user_id, title, subject, topic, subtopic, duration,
                    student_level, objective, created_at
             FROM lesson_plan
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let sections = sqlx::query_as::<_, Section>(
            "SELECT s.id, s.lesson_plan_id, s.position, s.title, s.content, s.duration
             FROM lesson_section s
             JOIN lesson_plan p ON p.id = s.lesson_plan_id
             WHERE p.user_id = ?1
             ORDER BY s.lesson_plan_id, s.position",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut by_plan: HashMap<String, Vec<Section>> = HashMap::new();
        for section in sections {
            by_plan
                .entry(section.lesson_plan_id.clone())
                .or_default()
                .push(section);
        }

        plan_rows
            .iter()
            .map(|row| {
                let mut plan = plan_from_row(row)?;
                plan.sections = by_plan.remove(&plan.id).unwrap_or_default();
                Ok(plan)
            })
            .collect()
    }

    /// A single lesson plan; plans owned by another user are not found
    pub async fn get_lesson_plan(&self, user_id: &str, plan_id: &str) -> AppResult<LessonPlan> {
        let row = sqlx::query(
            "SELECT id, user_id, title, subject, topic, subtopic, duration,
                    student_level, objective, created_at
             FROM lesson_plan
             WHERE id = ?1 AND user_id = ?2",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lesson plan {} not found", plan_id)))?;

        let mut plan = plan_from_row(&row)?;
        plan.sections = sqlx::query_as::<_, Section>(
            "SELECT id, lesson_plan_id, position, title, content, duration
             FROM lesson_section
             WHERE lesson_plan_id = ?1
             ORDER BY position",
        )
        .bind(plan_id)
        .fetch_all(&self.db)
        .await?;

        Ok(plan)
    }
}

/// Insert a generated post on a caller-owned connection or transaction
pub async fn insert_generated_content(
    conn: &mut SqliteConnection,
    user_id: &str,
    content: &str,
    prompt: &str,
    content_type: ContentType,
) -> AppResult<GeneratedContent> {
    let created_at = Utc::now();

    let id = sqlx::query(
        "INSERT INTO generated_content (user_id, content_type, prompt, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(user_id)
    .bind(content_type.as_str())
    .bind(prompt)
    .bind(content)
    .bind(created_at)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    tracing::debug!(user_id, content_id = id, content_type = %content_type, "stored generated content");

    Ok(GeneratedContent {
        id,
        user_id: user_id.to_string(),
        content_type,
        prompt: prompt.to_string(),
        content: content.to_string(),
        created_at,
    })
}

/// Insert a lesson plan and its sections on a caller-owned transaction
pub async fn insert_lesson_plan(
    conn: &mut SqliteConnection,
    plan: &NewLessonPlan,
) -> AppResult<LessonPlan> {
    if plan.duration < 0 || plan.sections.iter().any(|s| s.duration < 0) {
        return Err(AppError::Validation(
            "Durations cannot be negative".to_string(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now();

    sqlx::query(
        "INSERT INTO lesson_plan (id, user_id, title, subject, topic, subtopic, duration,
                                  student_level, objective, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(&id)
    .bind(&plan.user_id)
    .bind(&plan.topic)
    .bind(&plan.subtopic)
    .bind(&plan.topic)
    .bind(&plan.subtopic)
    .bind(plan.duration)
    .bind(&plan.student_level)
    .bind(&plan.objective)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    let mut sections = Vec::with_capacity(plan.sections.len());
    for (position, section) in plan.sections.iter().enumerate() {
        let position = position as i64;
        let section_id = sqlx::query(
            "INSERT INTO lesson_section (lesson_plan_id, position, title, content, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(position)
        .bind(&section.title)
        .bind(&section.content)
        .bind(section.duration)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        sections.push(Section {
            id: section_id,
            lesson_plan_id: id.clone(),
            position,
            title: section.title.clone(),
            content: section.content.clone(),
            duration: section.duration,
        });
    }

    tracing::debug!(user_id = %plan.user_id, plan_id = %id, sections = sections.len(), "stored lesson plan");

    Ok(LessonPlan {
        id,
        user_id: plan.user_id.clone(),
        title: plan.topic.clone(),
        subject: plan.subtopic.clone(),
        topic: plan.topic.clone(),
        subtopic: plan.subtopic.clone(),
        duration: plan.duration,
        student_level: plan.student_level.clone(),
        objective: plan.objective.clone(),
        created_at,
        sections,
    })
}

fn content_from_row(row: &SqliteRow) -> AppResult<GeneratedContent> {
    let content_type: String = row.get("content_type");
    let content_type = content_type.parse().map_err(AppError::Internal)?;

    Ok(GeneratedContent {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content_type,
        prompt: row.get("prompt"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

fn plan_from_row(row: &SqliteRow) -> AppResult<LessonPlan> {
    Ok(LessonPlan {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        subject: row.try_get("subject")?,
        topic: row.try_get("topic")?,
        subtopic: row.try_get("subtopic")?,
        duration: row.try_get("duration")?,
        student_level: row.try_get("student_level")?,
        objective: row.try_get("objective")?,
        created_at: row.try_get("created_at")?,
        sections: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NewSection;
    use crate::db;

    async fn setup() -> (SqlitePool, ContentManager) {
        let pool = db::memory_pool().await;
        for user in ["user_a", "user_b"] {
            sqlx::query(
                "INSERT INTO users (id, email, name, points, created_at) VALUES (?1, ?2, ?1, 50, ?3)",
            )
            .bind(user)
            .bind(format!("{}@example.com", user))
            .bind(Utc::now())
            .execute(&pool)
            .await
            .unwrap();
        }
        let manager = ContentManager::new(pool.clone());
        (pool, manager)
    }

    fn new_plan(user_id: &str) -> NewLessonPlan {
        NewLessonPlan {
            user_id: user_id.to_string(),
            topic: "Photosynthesis".to_string(),
            subtopic: "Light reactions".to_string(),
            duration: 45,
            student_level: "Undergraduate".to_string(),
            objective: "Explain the electron transport chain".to_string(),
            sections: vec![
                NewSection {
                    title: "Warm-up".to_string(),
                    content: "Recall prior knowledge".to_string(),
                    duration: 10,
                },
                NewSection {
                    title: "Lecture".to_string(),
                    content: "Thylakoid membrane".to_string(),
                    duration: 30,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_history_is_most_recent_first() {
        let (_pool, manager) = setup().await;

        let first = manager
            .save_generated_content("user_a", "first", "p1", ContentType::LinkedIn)
            .await
            .unwrap();
        let second = manager
            .save_generated_content("user_a", "second", "p2", ContentType::Instagram)
            .await
            .unwrap();
        manager
            .save_generated_content("user_b", "other", "p3", ContentType::Twitter)
            .await
            .unwrap();

        let history = manager.get_history("user_a").await.unwrap();
        let ids: Vec<i64> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(history[0].content_type, ContentType::Instagram);
    }

    #[tokio::test]
    async fn test_save_and_get_lesson_plan() {
        let (_pool, manager) = setup().await;

        let stored = manager.save_lesson_plan(&new_plan("user_a")).await.unwrap();
        assert_eq!(stored.title, "Photosynthesis");
        assert_eq!(stored.subject, "Light reactions");

        let loaded = manager.get_lesson_plan("user_a", &stored.id).await.unwrap();
        let titles: Vec<&str> = loaded.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Warm-up", "Lecture"]);
        assert_eq!(loaded.duration, 45);

        let listed = manager.list_lesson_plans("user_a").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sections.len(), 2);
    }

    #[tokio::test]
    async fn test_other_users_plan_is_not_found() {
        let (_pool, manager) = setup().await;
        let stored = manager.save_lesson_plan(&new_plan("user_a")).await.unwrap();

        let result = manager.get_lesson_plan("user_b", &stored.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(manager.list_lesson_plans("user_b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_duration_writes_nothing() {
        let (pool, manager) = setup().await;
        let mut plan = new_plan("user_a");
        plan.sections[1].duration = -5;

        let result = manager.save_lesson_plan(&plan).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_plan")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
