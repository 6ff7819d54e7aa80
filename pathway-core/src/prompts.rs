//! Prompt templates for the pipeline stages. Every template pins the model to
//! a single JSON object so [crate::parse_stage_response] can do its job.

use crate::{MasteryDepth, OutlineEntry};

pub(crate) struct StagePrompt {
    pub system: String,
    pub user: String,
}

const JSON_ONLY: &str = "Output ONLY the JSON object, nothing else. No code fences, no commentary.";

pub(crate) fn validation(topic: &str) -> StagePrompt {
    StagePrompt {
        system: format!(
            "You are a content moderator for a learning platform. Decide whether a \
requested course topic is appropriate to build an educational course about. \
Reject topics that are gibberish, hateful, sexually explicit, or instructions \
for causing harm. Hard or niche topics are fine.\n\n\
Answer with a JSON object: {{\"isAppropriate\": true|false, \"reason\": \"<short reason, only when rejecting>\"}}. \
{JSON_ONLY}"
        ),
        user: format!("Course topic: {topic}"),
    }
}

pub(crate) fn title(topic: &str) -> StagePrompt {
    StagePrompt {
        system: format!(
            "You name courses for a learning platform. Rewrite the raw topic into a \
short, marketable course title of at most 8 words. Keep the subject matter, \
drop filler.\n\n\
Answer with a JSON object: {{\"title\": \"<course title>\"}}. {JSON_ONLY}"
        ),
        user: format!("Raw topic: {topic}"),
    }
}

pub(crate) fn outline(title: &str, knowledge_level: &str, depth: MasteryDepth) -> StagePrompt {
    let (min_steps, max_steps) = depth.step_range();

    StagePrompt {
        system: format!(
            "You design course outlines for a learning platform. Produce an ordered \
list of {min_steps} to {max_steps} steps that take a learner from their current level to a \
working understanding of the course subject. Each step needs a title, a short \
title of at most 3 words for navigation, and a one-sentence description.\n\n\
Answer with a JSON object: {{\"steps\": [{{\"title\": \"...\", \"shortTitle\": \"...\", \"description\": \"...\"}}]}}. \
{JSON_ONLY}"
        ),
        user: format!(
            "Course title: {title}\nLearner's current level: {knowledge_level}\nCoverage: {depth}"
        ),
    }
}

pub(crate) fn step_content(course_title: &str, entry: &OutlineEntry) -> StagePrompt {
    StagePrompt {
        system: format!(
            "You write lesson content for a learning platform. For the given course \
step, produce 2 to 4 sub-steps. Each sub-step has a title, teaching content as \
semantic HTML (<p>, <ul>, <code>, <strong> only), a one-sentence summary, and \
an exercise with a task and its solution. Also include one fun fact about the \
step's subject and 2 to 3 external links to reputable further reading.\n\n\
Answer with a JSON object: {{\"subSteps\": [{{\"title\": \"...\", \"content\": \"...\", \
\"summary\": \"...\", \"exercise\": {{\"task\": \"...\", \"solution\": \"...\"}}}}], \
\"funFact\": \"...\", \"externalLinks\": [{{\"title\": \"...\", \"url\": \"...\"}}]}}. \
{JSON_ONLY}"
        ),
        user: format!(
            "Course: {course_title}\nStep: {}\nWhat this step covers: {}",
            entry.title, entry.description
        ),
    }
}

pub(crate) fn quiz(course_title: &str, step_title: &str, summaries: &[String]) -> StagePrompt {
    StagePrompt {
        system: format!(
            "You write quizzes for a learning platform. Produce 3 to 5 multiple \
choice questions testing the given step. Each question has exactly 4 options, \
the index of the correct one, and a short explanation of the answer.\n\n\
Answer with a JSON object: {{\"questions\": [{{\"question\": \"...\", \"options\": \
[\"...\", \"...\", \"...\", \"...\"], \"correctIndex\": 0, \"explanation\": \"...\"}}]}}. \
{JSON_ONLY}"
        ),
        user: format!(
            "Course: {course_title}\nStep: {step_title}\nWhat the step taught:\n{}",
            summaries.join("\n")
        ),
    }
}
