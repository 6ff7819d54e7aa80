//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from the platform's data types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use pathway_collab::{
    CheckoutSession as CollabCheckoutSession, CourseData, FriendRequestData, LimitDecision,
    MarketplaceCourseData, NotificationData, RoomToken as CollabRoomToken, SessionData, StepData,
    UserData, WhiteboardData,
};
use pathway_core::{
    Exercise as CoreExercise, ExternalLink as CoreExternalLink, QuizQuestion as CoreQuizQuestion,
    SubStep as CoreSubStep,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    username: String,
    display_name: String,
    email: String,
    photo_url: Option<String>,
    /// The effective tier after subscription standing is considered
    plan: String,
    subscription_status: Option<String>,
    cancel_at_period_end: bool,
    current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    task: String,
    solution: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    title: String,
    content: String,
    summary: String,
    exercise: Exercise,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLink {
    title: String,
    url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    question: String,
    options: Vec<String>,
    correct_index: u32,
    explanation: String,
    user_answer: Option<u32>,
    correct: Option<bool>,
    score: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    ordinal: i32,
    title: String,
    short_title: String,
    description: String,
    sub_steps: Vec<SubStep>,
    quiz: Option<Vec<QuizQuestion>>,
    fun_fact: Option<String>,
    external_links: Vec<ExternalLink>,
    completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    id: i32,
    slug: String,
    topic: String,
    title: String,
    knowledge_level: String,
    depth: String,
    mode: String,
    notes: String,
    public: bool,
    created_at: DateTime<Utc>,
    steps: Vec<Step>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    id: i32,
    sender_id: i32,
    recipient_id: i32,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: i32,
    kind: String,
    actor_id: i32,
    course_id: Option<i32>,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceCourse {
    id: i32,
    course_id: i32,
    publisher_id: i32,
    category: String,
    title: String,
    topic: String,
    step_count: usize,
    likes: i32,
    liked_by: Vec<i32>,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Whiteboard {
    id: i32,
    room_id: String,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    allowed: bool,
    remaining: u32,
    limit: u32,
    next_reset: Option<DateTime<Utc>>,
}

/// Both quota snapshots at once
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub course: Limit,
    pub whiteboard: Limit,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    id: String,
    url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomToken {
    token: String,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            photo_url: self.photo_url.clone(),
            plan: self.tier().as_str().to_string(),
            subscription_status: self.subscription_status.clone(),
            cancel_at_period_end: self.cancel_at_period_end,
            current_period_end: self.current_period_end,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Exercise> for CoreExercise {
    fn to_serialized(&self) -> Exercise {
        Exercise {
            task: self.task.clone(),
            solution: self.solution.clone(),
        }
    }
}

impl ToSerialized<SubStep> for CoreSubStep {
    fn to_serialized(&self) -> SubStep {
        SubStep {
            title: self.title.clone(),
            content: self.content.clone(),
            summary: self.summary.clone(),
            exercise: self.exercise.to_serialized(),
        }
    }
}

impl ToSerialized<ExternalLink> for CoreExternalLink {
    fn to_serialized(&self) -> ExternalLink {
        ExternalLink {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

impl ToSerialized<QuizQuestion> for CoreQuizQuestion {
    fn to_serialized(&self) -> QuizQuestion {
        QuizQuestion {
            question: self.question.clone(),
            options: self.options.clone(),
            correct_index: self.correct_index,
            explanation: self.explanation.clone(),
            user_answer: self.user_answer,
            correct: self.correct,
            score: self.score,
        }
    }
}

impl ToSerialized<Step> for StepData {
    fn to_serialized(&self) -> Step {
        Step {
            ordinal: self.ordinal,
            title: self.title.clone(),
            short_title: self.short_title.clone(),
            description: self.description.clone(),
            sub_steps: self.sub_steps.to_serialized(),
            quiz: self.quiz.as_ref().map(|q| q.to_serialized()),
            fun_fact: self.fun_fact.clone(),
            external_links: self.external_links.to_serialized(),
            completed: self.completed,
        }
    }
}

impl ToSerialized<Course> for CourseData {
    fn to_serialized(&self) -> Course {
        Course {
            id: self.id,
            slug: self.slug.clone(),
            topic: self.topic.clone(),
            title: self.title.clone(),
            knowledge_level: self.knowledge_level.clone(),
            depth: self.depth.clone(),
            mode: self.mode.clone(),
            notes: self.notes.clone(),
            public: self.public,
            created_at: self.created_at,
            steps: self.steps.to_serialized(),
        }
    }
}

impl ToSerialized<FriendRequest> for FriendRequestData {
    fn to_serialized(&self) -> FriendRequest {
        FriendRequest {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            status: self.status.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Notification> for NotificationData {
    fn to_serialized(&self) -> Notification {
        Notification {
            id: self.id,
            kind: self.kind.clone(),
            actor_id: self.actor_id,
            course_id: self.course_id,
            status: self.status.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<MarketplaceCourse> for MarketplaceCourseData {
    fn to_serialized(&self) -> MarketplaceCourse {
        MarketplaceCourse {
            id: self.id,
            course_id: self.course_id,
            publisher_id: self.publisher_id,
            category: self.category.clone(),
            title: self.title.clone(),
            topic: self.topic.clone(),
            step_count: self.snapshot.steps.len(),
            likes: self.likes,
            liked_by: self.liked_by.clone(),
            published_at: self.published_at,
        }
    }
}

impl ToSerialized<Whiteboard> for WhiteboardData {
    fn to_serialized(&self) -> Whiteboard {
        Whiteboard {
            id: self.id,
            room_id: self.room_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Limit> for LimitDecision {
    fn to_serialized(&self) -> Limit {
        Limit {
            allowed: self.allowed,
            remaining: self.remaining,
            limit: self.limit,
            next_reset: self.next_reset,
        }
    }
}

impl ToSerialized<CheckoutSession> for CollabCheckoutSession {
    fn to_serialized(&self) -> CheckoutSession {
        CheckoutSession {
            id: self.id.clone(),
            url: self.url.clone(),
        }
    }
}

impl ToSerialized<RoomToken> for CollabRoomToken {
    fn to_serialized(&self) -> RoomToken {
        RoomToken {
            token: self.token.clone(),
        }
    }
}
