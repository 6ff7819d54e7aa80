//! Request bodies accepted by the endpoints, with their validation rules.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

use pathway_core::{CourseMode, MasteryDepth};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserSchema {
    #[validate(length(min = 2, max = 128))]
    pub display_name: Option<String>,
    #[validate(url)]
    pub photo_url: Option<String>,
}

/// Wire twin of [MasteryDepth]
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DepthSchema {
    QuickOverview,
    NormalPath,
}

impl From<DepthSchema> for MasteryDepth {
    fn from(value: DepthSchema) -> Self {
        match value {
            DepthSchema::QuickOverview => Self::QuickOverview,
            DepthSchema::NormalPath => Self::NormalPath,
        }
    }
}

/// Wire twin of [CourseMode]
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ModeSchema {
    Solo,
    Collaborative,
}

impl From<ModeSchema> for CourseMode {
    fn from(value: ModeSchema) -> Self {
        match value {
            ModeSchema::Solo => Self::Solo,
            ModeSchema::Collaborative => Self::Collaborative,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCourseSchema {
    #[validate(length(min = 3, max = 200))]
    pub topic: String,
    #[validate(length(min = 2, max = 100))]
    pub knowledge_level: String,
    pub depth: DepthSchema,
    pub mode: ModeSchema,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateNotesSchema {
    #[validate(length(max = 20000))]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StepCompletionSchema {
    pub completed: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuizAnswersSchema {
    /// One entry per question, `null` for skipped ones
    pub answers: Vec<Option<u32>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShareCourseSchema {
    pub friend_id: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FriendRequestSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PublishCourseSchema {
    pub course_id: i32,
    #[validate(length(min = 2, max = 64))]
    pub category: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewWhiteboardSchema {
    #[validate(length(min = 1, max = 128))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenewalSchema {
    pub cancel_at_period_end: bool,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<NewCourseSchema, _> = serde_json::from_str(
            r#"{"topic": "rust", "knowledgeLevel": "beginner", "depth": "quick-overview", "mode": "solo", "bogus": 1}"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_out_of_bounds_fields() {
        let schema: NewCourseSchema = serde_json::from_str(
            r#"{"topic": "ai", "knowledgeLevel": "beginner", "depth": "normal-path", "mode": "solo"}"#,
        )
        .unwrap();

        // Two characters is below the topic minimum
        assert!(schema.validate().is_err());
    }

    #[test]
    fn a_well_formed_course_request_passes() {
        let schema: NewCourseSchema = serde_json::from_str(
            r#"{"topic": "rust lifetimes", "knowledgeLevel": "beginner", "depth": "quick-overview", "mode": "collaborative", "public": true}"#,
        )
        .unwrap();

        assert!(schema.validate().is_ok());
        assert!(matches!(schema.depth, DepthSchema::QuickOverview));
        assert!(schema.public);
    }

    #[test]
    fn registration_requires_a_real_email() {
        let schema: RegisterSchema = serde_json::from_str(
            r#"{"displayName": "Ada", "username": "ada", "password": "supersecret", "email": "not-an-email"}"#,
        )
        .unwrap();

        assert!(schema.validate().is_err());
    }
}
