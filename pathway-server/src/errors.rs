use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use pathway_collab::{
    AuthError, BillingError, CourseError, DatabaseError, MarketplaceError, SocialError,
    WhiteboardError,
};
use pathway_core::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("{0}")]
    TopicRejected(String),
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("{0}")]
    BadRequest(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::LimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::TopicRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GenerationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(value: PipelineError) -> Self {
        match value {
            e @ PipelineError::InappropriateTopic { .. } => Self::TopicRejected(e.to_string()),
            e => Self::GenerationFailed(e.to_string()),
        }
    }
}

impl From<CourseError> for ServerError {
    fn from(value: CourseError) -> Self {
        match value {
            e @ CourseError::LimitExceeded(_) => Self::LimitExceeded(e.to_string()),
            e @ CourseError::NotOwner => Self::Forbidden(e.to_string()),
            e @ CourseError::NoQuiz => Self::BadRequest(e.to_string()),
            CourseError::Generation(e) => e.into(),
            CourseError::Db(e) => e.into(),
        }
    }
}

impl From<SocialError> for ServerError {
    fn from(value: SocialError) -> Self {
        match value {
            SocialError::Db(e) => e.into(),
            e @ SocialError::NotAddressee => Self::Forbidden(e.to_string()),
            e @ SocialError::NotFriends => Self::Forbidden(e.to_string()),
            e @ SocialError::InvitationConsumed => Self::Conflict {
                resource: "course invitation",
                field: "consumed",
                value: e.to_string(),
            },
            e => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<MarketplaceError> for ServerError {
    fn from(value: MarketplaceError) -> Self {
        match value {
            e @ MarketplaceError::LimitExceeded(_) => Self::LimitExceeded(e.to_string()),
            e @ MarketplaceError::NotOwner => Self::Forbidden(e.to_string()),
            MarketplaceError::Db(e) => e.into(),
        }
    }
}

impl From<BillingError> for ServerError {
    fn from(value: BillingError) -> Self {
        match value {
            BillingError::InvalidSignature => Self::InvalidSignature,
            e @ BillingError::MalformedPayload(_) => Self::BadRequest(e.to_string()),
            BillingError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<WhiteboardError> for ServerError {
    fn from(value: WhiteboardError) -> Self {
        match value {
            e @ WhiteboardError::LimitExceeded(_) => Self::LimitExceeded(e.to_string()),
            e @ WhiteboardError::NotOwner => Self::Forbidden(e.to_string()),
            WhiteboardError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_map_to_their_status_codes() {
        let not_found = ServerError::NotFound {
            resource: "course",
            identifier: "slug",
        };
        assert_eq!(not_found.as_status_code(), StatusCode::NOT_FOUND);

        let limit = ServerError::LimitExceeded("Course creation limit reached".to_string());
        assert_eq!(limit.as_status_code(), StatusCode::TOO_MANY_REQUESTS);

        let rejected = ServerError::TopicRejected("topic rejected: gibberish".to_string());
        assert_eq!(rejected.as_status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(
            ServerError::InvalidSignature.as_status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
