use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How thoroughly a course covers its topic. Controls the outline size the
/// model is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MasteryDepth {
    QuickOverview,
    NormalPath,
}

impl MasteryDepth {
    /// The soft step-count range the outline prompt asks for.
    pub fn step_range(&self) -> (u8, u8) {
        match self {
            Self::QuickOverview => (5, 7),
            Self::NormalPath => (12, 15),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickOverview => "quick-overview",
            Self::NormalPath => "normal-path",
        }
    }
}

impl Display for MasteryDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasteryDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick-overview" => Ok(Self::QuickOverview),
            "normal-path" => Ok(Self::NormalPath),
            other => Err(format!("unknown mastery depth: {other}")),
        }
    }
}

/// Whether a course is worked through alone or together with friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CourseMode {
    Solo,
    Collaborative,
}

impl CourseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Collaborative => "collaborative",
        }
    }
}

impl Display for CourseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solo" => Ok(Self::Solo),
            "collaborative" => Ok(Self::Collaborative),
            other => Err(format!("unknown course mode: {other}")),
        }
    }
}

/// A two-part exercise attached to a sub-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub task: String,
    pub solution: String,
}

/// A unit of step content. `content` carries provider-generated HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub exercise: Exercise,
}

/// An external reading recommendation. Only links with a parseable URL
/// survive assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLink {
    pub title: String,
    pub url: String,
}

/// A multiple choice question. The answer fields stay empty until the user
/// submits an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
    pub explanation: String,
    #[serde(default)]
    pub user_answer: Option<u32>,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub score: Option<u32>,
}

/// One step of a generated course, merged from its outline entry and its
/// content stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStep {
    pub ordinal: u32,
    pub title: String,
    pub short_title: String,
    pub description: String,
    pub sub_steps: Vec<SubStep>,
    pub fun_fact: Option<String>,
    pub external_links: Vec<ExternalLink>,
}

/// The complete output of a pipeline run. Persistence is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCourse {
    pub topic: String,
    pub title: String,
    pub knowledge_level: String,
    pub depth: MasteryDepth,
    pub steps: Vec<GeneratedStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastery_depth_round_trips_through_strings() {
        for depth in [MasteryDepth::QuickOverview, MasteryDepth::NormalPath] {
            assert_eq!(depth.as_str().parse::<MasteryDepth>().unwrap(), depth);
        }

        assert!("speedrun".parse::<MasteryDepth>().is_err());
    }

    #[test]
    fn step_ranges_follow_depth() {
        assert_eq!(MasteryDepth::QuickOverview.step_range(), (5, 7));
        assert_eq!(MasteryDepth::NormalPath.step_range(), (12, 15));
    }
}
