use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pathway_core::{ExternalLink, QuizQuestion, SubStep};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A pathway account.
/// `plan` holds the raw tier string; [crate::PlanTier] derivation also
/// considers the subscription status.
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub plan: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    /// Lifetime whiteboard creation counter, checked against the tier cap
    pub whiteboards_created: i32,
    pub created_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A generated course and its steps
#[derive(Debug, Clone)]
pub struct CourseData {
    pub id: PrimaryKey,
    /// A slug used to identify the course
    pub slug: String,
    pub topic: String,
    pub title: String,
    pub knowledge_level: String,
    pub depth: String,
    pub mode: String,
    pub notes: String,
    pub public: bool,
    /// The owner of the course
    pub user_id: PrimaryKey,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<StepData>,
}

/// One step of a course. Sub-steps, quiz, and links are document-shaped and
/// stored as JSON columns, read and written whole.
#[derive(Debug, Clone)]
pub struct StepData {
    pub id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub ordinal: i32,
    pub title: String,
    pub short_title: String,
    pub description: String,
    pub sub_steps: Vec<SubStep>,
    pub quiz: Option<Vec<QuizQuestion>>,
    pub fun_fact: Option<String>,
    pub external_links: Vec<ExternalLink>,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// A pending or resolved friend request
#[derive(Debug, Clone)]
pub struct FriendRequestData {
    pub id: PrimaryKey,
    pub sender_id: PrimaryKey,
    pub recipient_id: PrimaryKey,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    FriendRequest,
    FriendAccepted,
    CourseShared,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FriendRequest => "friend-request",
            Self::FriendAccepted => "friend-accepted",
            Self::CourseShared => "course-shared",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend-request" => Ok(Self::FriendRequest),
            "friend-accepted" => Ok(Self::FriendAccepted),
            "course-shared" => Ok(Self::CourseShared),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Unread,
    Read,
    Accepted,
    Declined,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(format!("unknown notification status: {other}")),
        }
    }
}

/// A notification in a user's inbox
#[derive(Debug, Clone)]
pub struct NotificationData {
    pub id: PrimaryKey,
    /// The recipient
    pub user_id: PrimaryKey,
    pub kind: String,
    /// The user whose action caused the notification
    pub actor_id: PrimaryKey,
    pub course_id: Option<PrimaryKey>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// An invitation to copy a shared course
#[derive(Debug, Clone)]
pub struct InvitationData {
    pub id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub inviter_id: PrimaryKey,
    pub invitee_id: PrimaryKey,
    /// The `course-shared` notification accompanying the invitation
    pub notification_id: PrimaryKey,
    pub consumed: bool,
}

/// A published, shareable copy of a course
#[derive(Debug, Clone)]
pub struct MarketplaceCourseData {
    pub id: PrimaryKey,
    /// The course this listing was published from
    pub course_id: PrimaryKey,
    pub publisher_id: PrimaryKey,
    pub category: String,
    pub title: String,
    pub topic: String,
    /// Full content snapshot taken at publish time
    pub snapshot: pathway_core::GeneratedCourse,
    pub likes: i32,
    /// The users currently liking this listing
    pub liked_by: Vec<PrimaryKey>,
    pub published_at: DateTime<Utc>,
}

/// A collaborative whiteboard. All drawing state lives in the realtime
/// provider's room; this record only anchors ownership.
#[derive(Debug, Clone)]
pub struct WhiteboardData {
    pub id: PrimaryKey,
    /// The realtime provider's room identifier
    pub room_id: String,
    pub title: String,
    /// The owner of the whiteboard
    pub user_id: PrimaryKey,
    pub created_at: DateTime<Utc>,
}
