use crossbeam::channel::{Receiver, Sender};

use crate::{GenerationId, Stage};

pub type EventSender = Sender<PipelineEvent>;
pub type EventReceiver = Receiver<PipelineEvent>;

/// Progress events emitted by the pipeline while a generation runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A stage of a generation has started.
    StageStarted {
        generation_id: GenerationId,
        stage: Stage,
    },
    /// Content for one outline step finished generating.
    StepGenerated {
        generation_id: GenerationId,
        ordinal: u32,
        title: String,
    },
    /// The generation produced a course.
    Completed {
        generation_id: GenerationId,
        step_count: usize,
    },
    /// The generation aborted.
    Failed {
        generation_id: GenerationId,
        error: String,
    },
}

impl PipelineEvent {
    /// The generation this event belongs to.
    pub fn generation_id(&self) -> GenerationId {
        match self {
            Self::StageStarted { generation_id, .. }
            | Self::StepGenerated { generation_id, .. }
            | Self::Completed { generation_id, .. }
            | Self::Failed { generation_id, .. } => *generation_id,
        }
    }

    /// Whether this event ends its generation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}
