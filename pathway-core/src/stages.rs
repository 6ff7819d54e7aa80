//! Typed responses for each pipeline stage, matching the JSON shapes the
//! prompts instruct the model to produce.

use serde::Deserialize;

use crate::Exercise;

/// Stage 1: moderation-style topic validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicValidation {
    pub is_appropriate: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Stage 2: the marketable course title.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleResponse {
    pub title: String,
}

/// One entry of the stage 3 outline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineEntry {
    pub title: String,
    pub short_title: String,
    pub description: String,
}

/// Stage 3: the ordered course outline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineResponse {
    pub steps: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStepResponse {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub exercise: Exercise,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub title: String,
    pub url: String,
}

/// Stage 4: content for a single outline entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepContentResponse {
    #[serde(default)]
    pub sub_steps: Vec<SubStepResponse>,
    #[serde(default)]
    pub fun_fact: Option<String>,
    #[serde(default)]
    pub external_links: Vec<LinkResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionResponse {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
    pub explanation: String,
}

/// On-demand quiz generation for a step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestionResponse>,
}
