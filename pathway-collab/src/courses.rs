use chrono::Utc;
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use thiserror::Error;

use pathway_core::{
    CourseMode, CourseRequest, GeneratedCourse, GeneratedStep, GenerationId, Generator,
    MasteryDepth, PipelineError, QuizQuestion,
};

use crate::{
    check_course_limit, util::random_string, CourseData, Database, DatabaseError, GenerationInfo,
    LimitDecision, NewCourse, PlatformContext, PrimaryKey,
};

lazy_static! {
    static ref SLUG_SANITIZER: Regex = Regex::new("[^a-z0-9]+").expect("slug pattern compiles");
}

#[derive(Debug, Error)]
pub enum CourseError {
    /// The user's course creation quota is exhausted
    #[error("Course creation limit reached")]
    LimitExceeded(LimitDecision),
    /// The acting user doesn't own the course
    #[error("Only the course owner may do this")]
    NotOwner,
    /// The step exists but has no quiz yet
    #[error("The step has no quiz to answer")]
    NoQuiz,
    /// The pipeline rejected or failed the generation
    #[error(transparent)]
    Generation(#[from] PipelineError),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// What a user asks for when creating a course.
#[derive(Debug, Clone)]
pub struct NewCourseRequest {
    pub topic: String,
    pub knowledge_level: String,
    pub depth: MasteryDepth,
    pub mode: CourseMode,
    pub public: bool,
}

pub struct CourseManager<G, Db> {
    context: PlatformContext<G, Db>,
}

impl<G, Db> CourseManager<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub fn new(context: &PlatformContext<G, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// The user's current course creation quota snapshot.
    pub async fn check_limit(&self, user_id: PrimaryKey) -> Result<LimitDecision, DatabaseError> {
        let user = self.context.database.user_by_id(user_id).await?;
        let times = self.context.database.course_creation_times(user_id).await?;

        Ok(check_course_limit(user.tier(), &times, Utc::now()))
    }

    /// Runs the full generation pipeline for the topic and persists the
    /// result. Nothing is written when any hard stage fails.
    pub async fn create_course(
        &self,
        user_id: PrimaryKey,
        request: NewCourseRequest,
    ) -> Result<CourseData, CourseError> {
        let user = self.context.database.user_by_id(user_id).await?;
        let times = self.context.database.course_creation_times(user_id).await?;

        let decision = check_course_limit(user.tier(), &times, Utc::now());
        if !decision.allowed {
            return Err(CourseError::LimitExceeded(decision));
        }

        let generation_id = GenerationId::new();

        // The event forwarder owns cleanup of this entry: the pipeline always
        // ends a run with a terminal event, and converting that event removes
        // the entry again.
        self.context.active_generations.insert(
            generation_id,
            GenerationInfo {
                user_id,
                topic: request.topic.clone(),
            },
        );

        let generated = self
            .context
            .pipeline
            .generate(
                generation_id,
                &CourseRequest {
                    topic: request.topic,
                    knowledge_level: request.knowledge_level,
                    depth: request.depth,
                },
            )
            .await?;

        let slug = self.unique_slug(&generated.title).await?;

        let course = self
            .context
            .database
            .create_course(NewCourse {
                slug,
                user_id,
                mode: request.mode.to_string(),
                public: request.public,
                content: generated,
            })
            .await?;

        self.context
            .database
            .record_course_creation(user_id, Utc::now())
            .await?;

        info!(
            "User {} created course \"{}\" with {} steps",
            user.display_name,
            course.title,
            course.steps.len()
        );

        Ok(course)
    }

    pub async fn course_by_id(&self, course_id: PrimaryKey) -> Result<CourseData, DatabaseError> {
        self.context.database.course_by_id(course_id).await
    }

    pub async fn course_by_slug(&self, slug: &str) -> Result<CourseData, DatabaseError> {
        self.context.database.course_by_slug(slug).await
    }

    pub async fn list_by_user(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<CourseData>, DatabaseError> {
        self.context.database.list_courses_by_user(user_id).await
    }

    pub async fn update_notes(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
        notes: &str,
    ) -> Result<CourseData, CourseError> {
        self.owned_course(user_id, course_id).await?;

        let course = self
            .context
            .database
            .update_course_notes(course_id, notes)
            .await?;

        Ok(course)
    }

    pub async fn set_step_completed(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
        ordinal: i32,
        completed: bool,
    ) -> Result<(), CourseError> {
        self.owned_course(user_id, course_id).await?;

        self.context
            .database
            .set_step_completed(course_id, ordinal, completed)
            .await?;

        Ok(())
    }

    /// Generates and stores a quiz for a step, on demand.
    pub async fn generate_quiz(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
        ordinal: i32,
    ) -> Result<Vec<QuizQuestion>, CourseError> {
        let course = self.owned_course(user_id, course_id).await?;
        let step = step_by_ordinal(&course, ordinal)?;

        let summaries: Vec<_> = step.sub_steps.iter().map(|s| s.summary.clone()).collect();

        let quiz = self
            .context
            .pipeline
            .generate_quiz(&course.title, &step.title, &summaries)
            .await?;

        self.context
            .database
            .set_step_quiz(course_id, ordinal, &quiz)
            .await?;

        Ok(quiz)
    }

    /// Scores a quiz attempt and stores the answered quiz.
    pub async fn submit_quiz(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
        ordinal: i32,
        answers: &[Option<u32>],
    ) -> Result<Vec<QuizQuestion>, CourseError> {
        let course = self.owned_course(user_id, course_id).await?;
        let step = step_by_ordinal(&course, ordinal)?;

        let mut quiz = step.quiz.clone().ok_or(CourseError::NoQuiz)?;

        for (index, question) in quiz.iter_mut().enumerate() {
            let answer = answers.get(index).copied().flatten();

            question.user_answer = answer;
            question.correct = answer.map(|a| a == question.correct_index);
            question.score = question.correct.map(u32::from);
        }

        self.context
            .database
            .set_step_quiz(course_id, ordinal, &quiz)
            .await?;

        Ok(quiz)
    }

    pub async fn delete_course(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
    ) -> Result<(), CourseError> {
        self.owned_course(user_id, course_id).await?;

        self.context.database.delete_course(course_id).await?;

        Ok(())
    }

    /// Fetches a course and ensures the acting user owns it.
    pub(crate) async fn owned_course(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
    ) -> Result<CourseData, CourseError> {
        let course = self.context.database.course_by_id(course_id).await?;

        if course.user_id != user_id {
            return Err(CourseError::NotOwner);
        }

        Ok(course)
    }

    /// Derives a slug from the title, suffixing on collision.
    async fn unique_slug(&self, title: &str) -> Result<String, DatabaseError> {
        let base = slugify(title);

        let mut candidate = base.clone();

        loop {
            match self.context.database.course_by_slug(&candidate).await {
                Err(DatabaseError::NotFound { .. }) => return Ok(candidate),
                Ok(_) => {
                    candidate = format!("{base}-{}", random_string(6).to_lowercase());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = SLUG_SANITIZER.replace_all(&lowered, "-");
    let trimmed = slug.trim_matches('-');

    if trimmed.is_empty() {
        "course".to_string()
    } else {
        trimmed.to_string()
    }
}

fn step_by_ordinal(course: &CourseData, ordinal: i32) -> Result<&crate::StepData, CourseError> {
    course
        .steps
        .iter()
        .find(|s| s.ordinal == ordinal)
        .ok_or(CourseError::Db(DatabaseError::NotFound {
            resource: "step",
            identifier: "ordinal",
        }))
}

/// Takes a content snapshot of a stored course, used for sharing and
/// marketplace publishing. Completion state does not carry over.
pub fn snapshot(course: &CourseData) -> GeneratedCourse {
    GeneratedCourse {
        topic: course.topic.clone(),
        title: course.title.clone(),
        knowledge_level: course.knowledge_level.clone(),
        depth: course
            .depth
            .parse()
            .unwrap_or(MasteryDepth::NormalPath),
        steps: course
            .steps
            .iter()
            .map(|step| GeneratedStep {
                ordinal: step.ordinal as u32,
                title: step.title.clone(),
                short_title: step.short_title.clone(),
                description: step.description.clone(),
                sub_steps: step.sub_steps.clone(),
                fun_fact: step.fun_fact.clone(),
                external_links: step.external_links.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_lowercase_and_hyphenated() {
        assert_eq!(slugify("Lifetimes Without Tears"), "lifetimes-without-tears");
        assert_eq!(slugify("C++ & Friends!"), "c-friends");
        assert_eq!(slugify("  Rust  "), "rust");
    }

    #[test]
    fn unusable_titles_fall_back_to_a_default_slug() {
        assert_eq!(slugify("!!!"), "course");
        assert_eq!(slugify(""), "course");
    }
}
