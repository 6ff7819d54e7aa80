use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use pathway_core::{GeneratedCourse, QuizQuestion};

mod data;
pub use data::*;

mod pg;
pub use pg::*;

use crate::SubscriptionPatch;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound { .. } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and mutate pathway data in a database
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn user_by_subscription_id(&self, subscription_id: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;
    async fn apply_subscription_patch(
        &self,
        user_id: PrimaryKey,
        patch: SubscriptionPatch,
    ) -> Result<UserData>;
    async fn increment_whiteboards_created(&self, user_id: PrimaryKey) -> Result<i32>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn course_by_id(&self, course_id: PrimaryKey) -> Result<CourseData>;
    async fn course_by_slug(&self, slug: &str) -> Result<CourseData>;
    async fn list_courses_by_user(&self, user_id: PrimaryKey) -> Result<Vec<CourseData>>;
    async fn create_course(&self, new_course: NewCourse) -> Result<CourseData>;
    async fn update_course_notes(&self, course_id: PrimaryKey, notes: &str) -> Result<CourseData>;
    async fn set_step_completed(
        &self,
        course_id: PrimaryKey,
        ordinal: i32,
        completed: bool,
    ) -> Result<()>;
    async fn set_step_quiz(
        &self,
        course_id: PrimaryKey,
        ordinal: i32,
        quiz: &[QuizQuestion],
    ) -> Result<()>;
    async fn delete_course(&self, course_id: PrimaryKey) -> Result<()>;
    async fn course_creation_times(&self, user_id: PrimaryKey) -> Result<Vec<DateTime<Utc>>>;
    async fn record_course_creation(&self, user_id: PrimaryKey, at: DateTime<Utc>) -> Result<()>;

    async fn friend_request_by_id(&self, request_id: PrimaryKey) -> Result<FriendRequestData>;
    async fn pending_friend_request(
        &self,
        sender_id: PrimaryKey,
        recipient_id: PrimaryKey,
    ) -> Result<FriendRequestData>;
    async fn create_friend_request(&self, new_request: NewFriendRequest)
        -> Result<FriendRequestData>;
    /// Accepts a request in one transaction: the friendship pair is inserted,
    /// the request and its originating notification are marked accepted, and
    /// a `friend-accepted` notification for the sender is created and
    /// returned.
    async fn accept_friend_request(&self, request_id: PrimaryKey) -> Result<NotificationData>;
    async fn decline_friend_request(&self, request_id: PrimaryKey) -> Result<()>;
    async fn friendship_exists(&self, a: PrimaryKey, b: PrimaryKey) -> Result<bool>;
    async fn list_friends(&self, user_id: PrimaryKey) -> Result<Vec<UserData>>;
    async fn delete_friendship(&self, a: PrimaryKey, b: PrimaryKey) -> Result<()>;

    async fn notification_by_id(&self, notification_id: PrimaryKey) -> Result<NotificationData>;
    async fn list_notifications(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>>;
    async fn create_notification(&self, new_notification: NewNotification)
        -> Result<NotificationData>;
    async fn set_notification_status(
        &self,
        notification_id: PrimaryKey,
        status: NotificationStatus,
    ) -> Result<()>;
    async fn mark_all_notifications_read(&self, user_id: PrimaryKey) -> Result<()>;

    async fn invitation_by_id(&self, invitation_id: PrimaryKey) -> Result<InvitationData>;
    async fn create_invitation(&self, new_invitation: NewInvitation) -> Result<InvitationData>;
    /// Accepts an invitation in one transaction: the copied course is
    /// inserted for the invitee, the invitation is consumed, and its
    /// notification is marked accepted.
    async fn accept_invitation(
        &self,
        invitation_id: PrimaryKey,
        copy: NewCourse,
    ) -> Result<CourseData>;
    async fn decline_invitation(&self, invitation_id: PrimaryKey) -> Result<()>;

    async fn marketplace_course_by_id(&self, listing_id: PrimaryKey)
        -> Result<MarketplaceCourseData>;
    async fn marketplace_course_by_course_id(
        &self,
        course_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData>;
    async fn list_marketplace_courses(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<MarketplaceCourseData>>;
    async fn create_marketplace_course(
        &self,
        new_listing: NewMarketplaceCourse,
    ) -> Result<MarketplaceCourseData>;
    /// Flips the user's like on a listing and adjusts the count, in one
    /// transaction.
    async fn toggle_marketplace_like(
        &self,
        listing_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData>;

    async fn whiteboard_by_id(&self, whiteboard_id: PrimaryKey) -> Result<WhiteboardData>;
    async fn list_whiteboards_by_user(&self, user_id: PrimaryKey) -> Result<Vec<WhiteboardData>>;
    async fn create_whiteboard(&self, new_whiteboard: NewWhiteboard) -> Result<WhiteboardData>;
    async fn delete_whiteboard(&self, whiteboard_id: PrimaryKey) -> Result<()>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewCourse {
    pub slug: String,
    /// The owner of the new course
    pub user_id: PrimaryKey,
    pub mode: String,
    pub public: bool,
    pub content: GeneratedCourse,
}

#[derive(Debug)]
pub struct NewFriendRequest {
    pub sender_id: PrimaryKey,
    pub recipient_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewNotification {
    /// The recipient of the notification
    pub user_id: PrimaryKey,
    pub kind: NotificationKind,
    /// The user whose action caused the notification
    pub actor_id: PrimaryKey,
    pub course_id: Option<PrimaryKey>,
}

#[derive(Debug)]
pub struct NewInvitation {
    pub course_id: PrimaryKey,
    pub inviter_id: PrimaryKey,
    pub invitee_id: PrimaryKey,
    pub notification_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewMarketplaceCourse {
    pub course_id: PrimaryKey,
    pub publisher_id: PrimaryKey,
    pub category: String,
    pub snapshot: GeneratedCourse,
}

#[derive(Debug)]
pub struct NewWhiteboard {
    pub room_id: String,
    pub title: String,
    /// The owner of the new whiteboard
    pub user_id: PrimaryKey,
}
