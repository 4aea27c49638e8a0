/// Prompt builders for content and lesson plan generation
use crate::content::{ContentType, LessonPlanInput};

/// Number of tweets requested for a thread
pub const THREAD_LENGTH: usize = 5;

/// Character limit per tweet
pub const MAX_TWEET_LENGTH: usize = 280;

/// Instruction for a social post
pub fn content_prompt(content_type: ContentType, prompt: &str, with_image: bool) -> String {
    let mut text = format!("Generate {} content about \"{}\".", content_type, prompt);

    if content_type.is_segmented() {
        text.push_str(&format!(
            " Provide a thread of {} tweets, each under {} characters.",
            THREAD_LENGTH, MAX_TWEET_LENGTH
        ));
    }

    if with_image {
        text.push_str(" Describe the image and incorporate it into the caption.");
    }

    text
}

/// Instruction for a structured lesson plan
pub fn lesson_plan_prompt(input: &LessonPlanInput) -> String {
    format!(
        r#"As an expert in education and curriculum development, create a comprehensive and detailed lesson plan for teachers, professionals, and PhD-level educators. The lesson plan should be structured as follows:

Topic: {topic}
Subtopic: {subtopic}
Total Duration: {duration} minutes
Student Level: {level}
Primary Objective: {objective}

Please provide a lesson plan that includes:
1. Introduction (2-3 sentences)
2. Learning outcomes (3-5 bullet points)
3. Materials and resources
4. Lesson breakdown into sections:
   - Section title
   - Duration
   - Content
   - Methods
5. Assessment strategies
6. Summary
Ensure that the total duration does not exceed {duration} minutes.

Instructions:
- Format the response strictly as a valid JSON object.
- Do not include any explanations, comments, or additional text outside the JSON.
- Use exactly these keys: "topic", "subtopic", "duration", "studentLevel", "objective", and "sections", where each section has "title", "content" and "duration".
- Example format:
  {{
    "topic": "Topic Name",
    "subtopic": "Subtopic Name",
    "duration": "{duration}",
    "studentLevel": "{level}",
    "objective": "Objective",
    "sections": [{{"title": "Introduction", "content": "...", "duration": "10"}}]
  }}"#,
        topic = input.topic,
        subtopic = input.subtopic,
        duration = input.duration,
        level = input.student_level,
        objective = input.objective,
    )
}
