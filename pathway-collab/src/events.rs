use crossbeam::channel::{Receiver, Sender};

use pathway_core::{Generator, PipelineEvent, Stage};

use crate::{Database, NotificationData, PlatformContext, PrimaryKey};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Events emitted by the platform
#[derive(Debug, Clone)]
pub enum CollabEvent {
    /// A generation moved into a new stage.
    GenerationStageStarted {
        user_id: PrimaryKey,
        topic: String,
        stage: Stage,
    },
    /// One step of a generation finished.
    GenerationStepFinished {
        user_id: PrimaryKey,
        topic: String,
        ordinal: u32,
        title: String,
    },
    /// A generation produced a course.
    GenerationCompleted {
        user_id: PrimaryKey,
        topic: String,
        step_count: usize,
    },
    /// A generation aborted.
    GenerationFailed {
        user_id: PrimaryKey,
        topic: String,
        error: String,
    },
    /// A notification landed in a user's inbox.
    NotificationCreated {
        user_id: PrimaryKey,
        notification: NotificationData,
    },
    /// A course was published to the marketplace.
    ListingPublished { title: String, category: String },
}

impl CollabEvent {
    /// Convert a pipeline event to a friendly collab event. Returns `None`
    /// for generations the platform isn't tracking (already finished).
    pub fn from_pipeline_event<G, Db>(
        context: &PlatformContext<G, Db>,
        event: PipelineEvent,
    ) -> Option<CollabEvent>
    where
        G: Generator,
        Db: Database,
    {
        let id = event.generation_id();
        let info = context
            .active_generations
            .get(&id)
            .map(|entry| entry.value().clone())?;

        if event.is_terminal() {
            context.active_generations.remove(&id);
        }

        let converted = match event {
            PipelineEvent::StageStarted { stage, .. } => Self::GenerationStageStarted {
                user_id: info.user_id,
                topic: info.topic,
                stage,
            },
            PipelineEvent::StepGenerated { ordinal, title, .. } => Self::GenerationStepFinished {
                user_id: info.user_id,
                topic: info.topic,
                ordinal,
                title,
            },
            PipelineEvent::Completed { step_count, .. } => Self::GenerationCompleted {
                user_id: info.user_id,
                topic: info.topic,
                step_count,
            },
            PipelineEvent::Failed { error, .. } => Self::GenerationFailed {
                user_id: info.user_id,
                topic: info.topic,
                error,
            },
        };

        Some(converted)
    }
}
