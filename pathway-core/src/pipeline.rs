use std::sync::Arc;

use crossbeam::channel::unbounded;
use log::warn;
use thiserror::Error;
use url::Url;

use crate::{
    parse_stage_response, prompts, CompletionRequest, EventReceiver, EventSender, ExternalLink,
    GenerationConfig, GeneratedCourse, GeneratedStep, Generator, GeneratorError, Id,
    MalformedResponse, MasteryDepth, OutlineEntry, OutlineResponse, PipelineEvent, QuizQuestion,
    QuizResponse, StepContentResponse, SubStep, TitleResponse, TopicValidation,
};

/// Marker type for [GenerationId].
pub struct Generation;
pub type GenerationId = Id<Generation>;

/// The pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Title,
    Outline,
    Content,
    Quiz,
}

/// Message prefix of [PipelineError::InappropriateTopic], asserted on by
/// callers that surface the rejection to the user.
pub const TOPIC_REJECTED_MARKER: &str = "topic rejected";

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The validation stage rejected the topic. Nothing after it ran.
    #[error("topic rejected: {reason}")]
    InappropriateTopic { reason: String },
    /// Every outline step failed to produce sub-steps.
    #[error("failed to generate content for any step")]
    NoContent,
    /// A model call kept failing after all attempts.
    #[error("model call failed after {tries} attempts: {source}")]
    Provider {
        tries: u32,
        #[source]
        source: GeneratorError,
    },
    /// A stage response did not match its expected shape.
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
}

/// What the caller wants a course about.
#[derive(Debug, Clone)]
pub struct CourseRequest {
    pub topic: String,
    pub knowledge_level: String,
    pub depth: MasteryDepth,
}

/// The pathway generation pipeline, turning a topic into course content
/// through four sequential prompt stages against a [Generator].
pub struct Pipeline<G> {
    generator: Arc<G>,
    config: GenerationConfig,

    event_sender: EventSender,
    event_receiver: EventReceiver,
}

impl<G> Pipeline<G>
where
    G: Generator,
{
    pub fn new(generator: G, config: GenerationConfig) -> Self {
        let (event_sender, event_receiver) = unbounded();

        Self {
            generator: Arc::new(generator),
            config,
            event_sender,
            event_receiver,
        }
    }

    /// Returns a receiver for progress events. Receivers share one stream.
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }

    /// Runs the orchestrated flow: validation, title, outline, then content
    /// for every outline entry. Model calls are strictly sequential with
    /// fixed pacing in between. Steps without content are dropped; a run
    /// where no step survives fails as a whole.
    pub async fn generate(
        &self,
        id: GenerationId,
        request: &CourseRequest,
    ) -> Result<GeneratedCourse, PipelineError> {
        match self.generate_inner(id, request).await {
            Ok(course) => {
                self.emit(PipelineEvent::Completed {
                    generation_id: id,
                    step_count: course.steps.len(),
                });

                Ok(course)
            }
            Err(e) => {
                self.emit(PipelineEvent::Failed {
                    generation_id: id,
                    error: e.to_string(),
                });

                Err(e)
            }
        }
    }

    async fn generate_inner(
        &self,
        id: GenerationId,
        request: &CourseRequest,
    ) -> Result<GeneratedCourse, PipelineError> {
        self.emit_stage(id, Stage::Validation);
        let validation: TopicValidation = self.call(prompts::validation(&request.topic)).await?;

        if !validation.is_appropriate {
            let reason = validation
                .reason
                .unwrap_or_else(|| "the topic is not suitable for a course".to_string());

            return Err(PipelineError::InappropriateTopic { reason });
        }

        self.pace().await;
        self.emit_stage(id, Stage::Title);
        let title: TitleResponse = self.call(prompts::title(&request.topic)).await?;

        self.pace().await;
        self.emit_stage(id, Stage::Outline);
        let outline: OutlineResponse = self
            .call(prompts::outline(
                &title.title,
                &request.knowledge_level,
                request.depth,
            ))
            .await?;

        self.emit_stage(id, Stage::Content);
        let mut steps = Vec::new();

        for (index, entry) in outline.steps.iter().enumerate() {
            self.pace().await;

            let ordinal = index as u32 + 1;
            let content: StepContentResponse =
                match self.call(prompts::step_content(&title.title, entry)).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!("Content for step \"{}\" failed: {e}", entry.title);
                        continue;
                    }
                };

            // A step without sub-steps has nothing to teach
            if content.sub_steps.is_empty() {
                warn!("Step \"{}\" produced no sub-steps, dropping it", entry.title);
                continue;
            }

            let step = assemble_step(ordinal, entry, content);

            self.emit(PipelineEvent::StepGenerated {
                generation_id: id,
                ordinal,
                title: step.title.clone(),
            });

            steps.push(step);
        }

        if steps.is_empty() {
            return Err(PipelineError::NoContent);
        }

        Ok(GeneratedCourse {
            topic: request.topic.clone(),
            title: title.title,
            knowledge_level: request.knowledge_level.clone(),
            depth: request.depth,
            steps,
        })
    }

    /// Generates a quiz for an already generated step, on demand. Not part of
    /// the orchestrated flow, so no pacing applies.
    pub async fn generate_quiz(
        &self,
        course_title: &str,
        step_title: &str,
        summaries: &[String],
    ) -> Result<Vec<QuizQuestion>, PipelineError> {
        let response: QuizResponse = self
            .call(prompts::quiz(course_title, step_title, summaries))
            .await?;

        let questions = response
            .questions
            .into_iter()
            .map(|q| QuizQuestion {
                question: q.question,
                options: q.options,
                correct_index: q.correct_index,
                explanation: q.explanation,
                user_answer: None,
                correct: None,
                score: None,
            })
            .collect();

        Ok(questions)
    }

    /// Performs one model call with bounded retries, then parses the
    /// response. Parse failures are not retried.
    async fn call<T>(&self, prompt: prompts::StagePrompt) -> Result<T, PipelineError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            system: prompt.system,
            user: prompt.user,
        };

        let mut tries = 0;

        let raw = loop {
            tries += 1;

            match self.generator.complete(request.clone()).await {
                Ok(raw) => break raw,
                Err(e) if tries >= self.config.max_tries => {
                    return Err(PipelineError::Provider { tries, source: e })
                }
                Err(e) => {
                    warn!("Model call failed, retrying: {e}");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        };

        Ok(parse_stage_response(&raw)?)
    }

    async fn pace(&self) {
        if !self.config.pacing.is_zero() {
            tokio::time::sleep(self.config.pacing).await;
        }
    }

    fn emit_stage(&self, id: GenerationId, stage: Stage) {
        self.emit(PipelineEvent::StageStarted {
            generation_id: id,
            stage,
        });
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.event_sender.send(event);
    }
}

fn assemble_step(ordinal: u32, entry: &OutlineEntry, content: StepContentResponse) -> GeneratedStep {
    let sub_steps = content
        .sub_steps
        .into_iter()
        .map(|s| SubStep {
            title: s.title,
            content: s.content,
            summary: s.summary,
            exercise: s.exercise,
        })
        .collect();

    let external_links = content
        .external_links
        .into_iter()
        .filter(|l| Url::parse(&l.url).is_ok())
        .map(|l| ExternalLink {
            title: l.title,
            url: l.url,
        })
        .collect();

    GeneratedStep {
        ordinal,
        title: entry.title.clone(),
        short_title: entry.short_title.clone(),
        description: entry.description.clone(),
        sub_steps,
        fun_fact: content.fun_fact,
        external_links,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::GeneratorResult;

    /// Replays a fixed list of responses and counts how many calls were made.
    struct ScriptedGenerator {
        responses: Mutex<Vec<GeneratorResult<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<GeneratorResult<String>>) -> Self {
            let mut responses = responses;
            responses.reverse();

            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn complete(&self, _request: CompletionRequest) -> GeneratorResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(GeneratorError::Empty))
        }
    }

    fn pipeline(responses: Vec<GeneratorResult<String>>) -> Pipeline<ScriptedGenerator> {
        Pipeline::new(
            ScriptedGenerator::new(responses),
            GenerationConfig::immediate("test-model"),
        )
    }

    fn request() -> CourseRequest {
        CourseRequest {
            topic: "rust lifetimes".to_string(),
            knowledge_level: "beginner".to_string(),
            depth: MasteryDepth::QuickOverview,
        }
    }

    fn outline_json() -> String {
        r#"{"steps": [
            {"title": "Borrowing", "shortTitle": "Borrow", "description": "References and the borrow checker."},
            {"title": "Lifetimes", "shortTitle": "Lifetimes", "description": "Annotating reference validity."}
        ]}"#
        .to_string()
    }

    fn content_json() -> String {
        r#"{"subSteps": [{
            "title": "Shared references",
            "content": "<p>&amp;T</p>",
            "summary": "Shared references are read-only.",
            "exercise": {"task": "Write a function taking &str", "solution": "fn f(s: &str) {}"}
        }],
        "funFact": "The borrow checker predates Rust 1.0.",
        "externalLinks": [
            {"title": "The Book", "url": "https://doc.rust-lang.org/book/"},
            {"title": "Broken", "url": "not a url"}
        ]}"#
        .to_string()
    }

    #[tokio::test]
    async fn inappropriate_topic_aborts_before_title_generation() {
        let pipeline = pipeline(vec![Ok(
            r#"{"isAppropriate": false, "reason": "gibberish topic"}"#.to_string()
        )]);

        let error = pipeline
            .generate(GenerationId::new(), &request())
            .await
            .unwrap_err();

        assert!(error.to_string().starts_with(TOPIC_REJECTED_MARKER));
        assert_eq!(pipeline.generator.calls(), 1);
    }

    #[tokio::test]
    async fn a_full_run_produces_every_surviving_step_in_order() {
        let pipeline = pipeline(vec![
            Ok(r#"{"isAppropriate": true}"#.to_string()),
            Ok(r#"{"title": "Lifetimes Without Tears"}"#.to_string()),
            Ok(outline_json()),
            Ok(content_json()),
            Ok(content_json()),
        ]);

        let course = pipeline
            .generate(GenerationId::new(), &request())
            .await
            .unwrap();

        assert_eq!(course.title, "Lifetimes Without Tears");
        assert_eq!(course.steps.len(), 2);
        assert_eq!(course.steps[0].ordinal, 1);
        assert_eq!(course.steps[0].title, "Borrowing");
        assert_eq!(course.steps[1].ordinal, 2);

        // The unparseable link is filtered during assembly
        assert_eq!(course.steps[0].external_links.len(), 1);
        assert_eq!(pipeline.generator.calls(), 5);
    }

    #[tokio::test]
    async fn steps_without_sub_steps_are_dropped() {
        let pipeline = pipeline(vec![
            Ok(r#"{"isAppropriate": true}"#.to_string()),
            Ok(r#"{"title": "Lifetimes Without Tears"}"#.to_string()),
            Ok(outline_json()),
            Ok(r#"{"subSteps": []}"#.to_string()),
            Ok(content_json()),
        ]);

        let course = pipeline
            .generate(GenerationId::new(), &request())
            .await
            .unwrap();

        assert_eq!(course.steps.len(), 1);
        assert_eq!(course.steps[0].title, "Lifetimes");
    }

    #[tokio::test]
    async fn a_run_where_every_step_fails_rejects_as_a_whole() {
        let pipeline = pipeline(vec![
            Ok(r#"{"isAppropriate": true}"#.to_string()),
            Ok(r#"{"title": "Lifetimes Without Tears"}"#.to_string()),
            Ok(outline_json()),
            Ok(r#"{"subSteps": []}"#.to_string()),
            Err(GeneratorError::Empty),
        ]);

        let error = pipeline
            .generate(GenerationId::new(), &request())
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::NoContent));
    }

    #[tokio::test]
    async fn a_malformed_outline_aborts_the_run() {
        let pipeline = pipeline(vec![
            Ok(r#"{"isAppropriate": true}"#.to_string()),
            Ok(r#"{"title": "Lifetimes Without Tears"}"#.to_string()),
            Ok("here is your outline, enjoy".to_string()),
        ]);

        let error = pipeline
            .generate(GenerationId::new(), &request())
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::Malformed(_)));
        assert_eq!(pipeline.generator.calls(), 3);
    }

    #[tokio::test]
    async fn progress_events_cover_the_whole_run() {
        let pipeline = pipeline(vec![
            Ok(r#"{"isAppropriate": true}"#.to_string()),
            Ok(r#"{"title": "Lifetimes Without Tears"}"#.to_string()),
            Ok(outline_json()),
            Ok(content_json()),
            Ok(content_json()),
        ]);

        let events = pipeline.events();
        let id = GenerationId::new();

        pipeline.generate(id, &request()).await.unwrap();

        let collected: Vec<_> = events.try_iter().collect();

        assert!(collected.iter().all(|e| e.generation_id() == id));
        assert!(matches!(
            collected.first(),
            Some(PipelineEvent::StageStarted {
                stage: Stage::Validation,
                ..
            })
        ));
        assert!(matches!(
            collected.last(),
            Some(PipelineEvent::Completed { step_count: 2, .. })
        ));
    }
}
