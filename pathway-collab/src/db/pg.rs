use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, types::Json, Error as SqlxError,
    PgPool, Postgres, Transaction,
};

use pathway_core::{ExternalLink, GeneratedCourse, QuizQuestion, SubStep};

use crate::{
    CourseData, Database, DatabaseError, DatabaseResult, FriendRequestData, IntoDatabaseError,
    InvitationData, MarketplaceCourseData, NewCourse, NewFriendRequest, NewInvitation,
    NewMarketplaceCourse, NewNotification, NewSession, NewUser, NewWhiteboard, NotificationData,
    NotificationStatus, PrimaryKey, RequestStatus, Result, SessionData, StepData,
    SubscriptionPatch, UpdatedUser, UserData, WhiteboardData,
};

/// A postgres database implementation for pathway
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    password: String,
    display_name: String,
    email: String,
    photo_url: Option<String>,
    plan: String,
    customer_id: Option<String>,
    subscription_id: Option<String>,
    subscription_status: Option<String>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    whiteboards_created: i32,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password: row.password,
            display_name: row.display_name,
            email: row.email,
            photo_url: row.photo_url,
            plan: row.plan,
            customer_id: row.customer_id,
            subscription_id: row.subscription_id,
            subscription_status: row.subscription_status,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            whiteboards_created: row.whiteboards_created,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: PrimaryKey,
    slug: String,
    topic: String,
    title: String,
    knowledge_level: String,
    depth: String,
    mode: String,
    notes: String,
    public: bool,
    user_id: PrimaryKey,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: PrimaryKey,
    course_id: PrimaryKey,
    ordinal: i32,
    title: String,
    short_title: String,
    description: String,
    sub_steps: Json<Vec<SubStep>>,
    quiz: Option<Json<Vec<QuizQuestion>>>,
    fun_fact: Option<String>,
    external_links: Json<Vec<ExternalLink>>,
    completed: bool,
}

impl From<StepRow> for StepData {
    fn from(row: StepRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            ordinal: row.ordinal,
            title: row.title,
            short_title: row.short_title,
            description: row.description,
            sub_steps: row.sub_steps.0,
            quiz: row.quiz.map(|q| q.0),
            fun_fact: row.fun_fact,
            external_links: row.external_links.0,
            completed: row.completed,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FriendRequestRow {
    id: PrimaryKey,
    sender_id: PrimaryKey,
    recipient_id: PrimaryKey,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<FriendRequestRow> for FriendRequestData {
    fn from(row: FriendRequestRow) -> Self {
        Self {
            id: row.id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    kind: String,
    actor_id: PrimaryKey,
    course_id: Option<PrimaryKey>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for NotificationData {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            actor_id: row.actor_id,
            course_id: row.course_id,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InvitationRow {
    id: PrimaryKey,
    course_id: PrimaryKey,
    inviter_id: PrimaryKey,
    invitee_id: PrimaryKey,
    notification_id: PrimaryKey,
    consumed: bool,
}

impl From<InvitationRow> for InvitationData {
    fn from(row: InvitationRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            inviter_id: row.inviter_id,
            invitee_id: row.invitee_id,
            notification_id: row.notification_id,
            consumed: row.consumed,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MarketplaceCourseRow {
    id: PrimaryKey,
    course_id: PrimaryKey,
    publisher_id: PrimaryKey,
    category: String,
    title: String,
    topic: String,
    snapshot: Json<GeneratedCourse>,
    likes: i32,
    published_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct WhiteboardRow {
    id: PrimaryKey,
    room_id: String,
    title: String,
    user_id: PrimaryKey,
    created_at: DateTime<Utc>,
}

impl From<WhiteboardRow> for WhiteboardData {
    fn from(row: WhiteboardRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            title: row.title,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Friendships store the pair normalized so one row covers both directions.
fn ordered_pair(a: PrimaryKey, b: PrimaryKey) -> (PrimaryKey, PrimaryKey) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn course_steps(&self, course_id: PrimaryKey) -> Result<Vec<StepData>> {
        let rows = query_as::<_, StepRow>(
            "SELECT * FROM steps WHERE course_id = $1 ORDER BY ordinal ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn listing_likes(&self, listing_id: PrimaryKey) -> Result<Vec<PrimaryKey>> {
        query_scalar::<_, PrimaryKey>(
            "SELECT user_id FROM marketplace_likes WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    fn assemble_course(&self, row: CourseRow, steps: Vec<StepData>) -> CourseData {
        CourseData {
            id: row.id,
            slug: row.slug,
            topic: row.topic,
            title: row.title,
            knowledge_level: row.knowledge_level,
            depth: row.depth,
            mode: row.mode,
            notes: row.notes,
            public: row.public,
            user_id: row.user_id,
            created_at: row.created_at,
            steps,
        }
    }

    fn assemble_listing(
        &self,
        row: MarketplaceCourseRow,
        liked_by: Vec<PrimaryKey>,
    ) -> MarketplaceCourseData {
        MarketplaceCourseData {
            id: row.id,
            course_id: row.course_id,
            publisher_id: row.publisher_id,
            category: row.category,
            title: row.title,
            topic: row.topic,
            snapshot: row.snapshot.0,
            likes: row.likes,
            liked_by,
            published_at: row.published_at,
        }
    }
}

/// Inserts a course and its steps inside the given transaction.
async fn insert_course(
    tx: &mut Transaction<'_, Postgres>,
    new_course: &NewCourse,
) -> Result<PrimaryKey> {
    let content = &new_course.content;

    let course_id = query_scalar::<_, PrimaryKey>(
        "INSERT INTO courses (slug, topic, title, knowledge_level, depth, mode, notes, public, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, '', $7, $8)
         RETURNING id",
    )
    .bind(&new_course.slug)
    .bind(&content.topic)
    .bind(&content.title)
    .bind(&content.knowledge_level)
    .bind(content.depth.as_str())
    .bind(&new_course.mode)
    .bind(new_course.public)
    .bind(new_course.user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| e.any())?;

    for step in &content.steps {
        query(
            "INSERT INTO steps
                (course_id, ordinal, title, short_title, description, sub_steps, fun_fact, external_links)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(course_id)
        .bind(step.ordinal as i32)
        .bind(&step.title)
        .bind(&step.short_title)
        .bind(&step.description)
        .bind(Json(&step.sub_steps))
        .bind(&step.fun_fact)
        .bind(Json(&step.external_links))
        .execute(&mut **tx)
        .await
        .map_err(|e| e.any())?;
    }

    Ok(course_id)
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "username"))
    }

    async fn user_by_subscription_id(&self, subscription_id: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE subscription_id = $1")
            .bind(subscription_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "subscription_id"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(&new_user.email)
            .fetch_one(&self.pool)
            .await
            .map(UserData::from)
            .map_err(|e| e.not_found_or("user", "email"))
            .conflict_or_ok("user", "email", &new_user.email)?;

        query_as::<_, UserRow>(
            "INSERT INTO users (username, password, display_name, email)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .bind(&new_user.email)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        query("UPDATE users SET display_name = $1, photo_url = $2 WHERE id = $3")
            .bind(updated_user.display_name.unwrap_or(user.display_name))
            .bind(updated_user.photo_url.or(user.photo_url))
            .bind(updated_user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn apply_subscription_patch(
        &self,
        user_id: PrimaryKey,
        patch: SubscriptionPatch,
    ) -> Result<UserData> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query(
            "UPDATE users SET
                plan = COALESCE($1, plan),
                customer_id = COALESCE($2, customer_id),
                subscription_id = COALESCE($3, subscription_id),
                subscription_status = COALESCE($4, subscription_status),
                current_period_end = COALESCE($5, current_period_end),
                cancel_at_period_end = COALESCE($6, cancel_at_period_end)
            WHERE id = $7",
        )
        .bind(patch.plan.map(|p| p.as_str()))
        .bind(patch.customer_id)
        .bind(patch.subscription_id)
        .bind(patch.status)
        .bind(patch.current_period_end)
        .bind(patch.cancel_at_period_end)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(user_id).await
    }

    async fn increment_whiteboards_created(&self, user_id: PrimaryKey) -> Result<i32> {
        query_scalar::<_, i32>(
            "UPDATE users SET whiteboards_created = whiteboards_created + 1
             WHERE id = $1
             RETURNING whiteboards_created",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "token"))?;

        let user = self.user_by_id(row.user_id).await?;

        Ok(SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let token = query_scalar::<_, String>(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3) RETURNING token",
        )
        .bind(&new_session.token)
        .bind(new_session.user_id)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.session_by_token(&token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn course_by_id(&self, course_id: PrimaryKey) -> Result<CourseData> {
        let row = query_as::<_, CourseRow>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("course", "id"))?;

        let steps = self.course_steps(course_id).await?;

        Ok(self.assemble_course(row, steps))
    }

    async fn course_by_slug(&self, slug: &str) -> Result<CourseData> {
        let row = query_as::<_, CourseRow>("SELECT * FROM courses WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("course", "slug"))?;

        let steps = self.course_steps(row.id).await?;

        Ok(self.assemble_course(row, steps))
    }

    async fn list_courses_by_user(&self, user_id: PrimaryKey) -> Result<Vec<CourseData>> {
        let rows = query_as::<_, CourseRow>(
            "SELECT * FROM courses WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut courses = Vec::with_capacity(rows.len());

        for row in rows {
            let steps = self.course_steps(row.id).await?;
            courses.push(self.assemble_course(row, steps));
        }

        Ok(courses)
    }

    async fn create_course(&self, new_course: NewCourse) -> Result<CourseData> {
        self.course_by_slug(&new_course.slug)
            .await
            .conflict_or_ok("course", "slug", &new_course.slug)?;

        // Ensure the owner exists
        let _ = self.user_by_id(new_course.user_id).await?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;
        let course_id = insert_course(&mut tx, &new_course).await?;
        tx.commit().await.map_err(|e| e.any())?;

        self.course_by_id(course_id).await
    }

    async fn update_course_notes(&self, course_id: PrimaryKey, notes: &str) -> Result<CourseData> {
        // Ensure course exists
        let _ = self.course_by_id(course_id).await?;

        query("UPDATE courses SET notes = $1 WHERE id = $2")
            .bind(notes)
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.course_by_id(course_id).await
    }

    async fn set_step_completed(
        &self,
        course_id: PrimaryKey,
        ordinal: i32,
        completed: bool,
    ) -> Result<()> {
        let result = query("UPDATE steps SET completed = $1 WHERE course_id = $2 AND ordinal = $3")
            .bind(completed)
            .bind(course_id)
            .bind(ordinal)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "step",
                identifier: "course_id:ordinal",
            });
        }

        Ok(())
    }

    async fn set_step_quiz(
        &self,
        course_id: PrimaryKey,
        ordinal: i32,
        quiz: &[QuizQuestion],
    ) -> Result<()> {
        let result = query("UPDATE steps SET quiz = $1 WHERE course_id = $2 AND ordinal = $3")
            .bind(Json(quiz))
            .bind(course_id)
            .bind(ordinal)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "step",
                identifier: "course_id:ordinal",
            });
        }

        Ok(())
    }

    async fn delete_course(&self, course_id: PrimaryKey) -> Result<()> {
        // Ensure course exists
        let _ = self.course_by_id(course_id).await?;

        query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn course_creation_times(&self, user_id: PrimaryKey) -> Result<Vec<DateTime<Utc>>> {
        query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM course_creations WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn record_course_creation(&self, user_id: PrimaryKey, at: DateTime<Utc>) -> Result<()> {
        query("INSERT INTO course_creations (user_id, created_at) VALUES ($1, $2)")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn friend_request_by_id(&self, request_id: PrimaryKey) -> Result<FriendRequestData> {
        query_as::<_, FriendRequestRow>("SELECT * FROM friend_requests WHERE id = $1")
            .bind(request_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("friend request", "id"))
    }

    async fn pending_friend_request(
        &self,
        sender_id: PrimaryKey,
        recipient_id: PrimaryKey,
    ) -> Result<FriendRequestData> {
        query_as::<_, FriendRequestRow>(
            "SELECT * FROM friend_requests
             WHERE sender_id = $1 AND recipient_id = $2 AND status = $3",
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(RequestStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("friend request", "sender:recipient"))
    }

    async fn create_friend_request(
        &self,
        new_request: NewFriendRequest,
    ) -> Result<FriendRequestData> {
        let request = query_as::<_, FriendRequestRow>(
            "INSERT INTO friend_requests (sender_id, recipient_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(new_request.sender_id)
        .bind(new_request.recipient_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(request.into())
    }

    async fn accept_friend_request(&self, request_id: PrimaryKey) -> Result<NotificationData> {
        let request = self.friend_request_by_id(request_id).await?;
        let (a, b) = ordered_pair(request.sender_id, request.recipient_id);

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        query("UPDATE friend_requests SET status = $1 WHERE id = $2")
            .bind(RequestStatus::Accepted.as_str())
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("INSERT INTO friendships (user_a, user_b) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(a)
            .bind(b)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query(
            "UPDATE notifications SET status = 'accepted'
             WHERE user_id = $1 AND actor_id = $2 AND kind = 'friend-request'",
        )
        .bind(request.recipient_id)
        .bind(request.sender_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        let notification = query_as::<_, NotificationRow>(
            "INSERT INTO notifications (user_id, kind, actor_id)
             VALUES ($1, 'friend-accepted', $2)
             RETURNING *",
        )
        .bind(request.sender_id)
        .bind(request.recipient_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(notification.into())
    }

    async fn decline_friend_request(&self, request_id: PrimaryKey) -> Result<()> {
        let request = self.friend_request_by_id(request_id).await?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        query("UPDATE friend_requests SET status = $1 WHERE id = $2")
            .bind(RequestStatus::Declined.as_str())
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query(
            "UPDATE notifications SET status = 'declined'
             WHERE user_id = $1 AND actor_id = $2 AND kind = 'friend-request'",
        )
        .bind(request.recipient_id)
        .bind(request.sender_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())
    }

    async fn friendship_exists(&self, a: PrimaryKey, b: PrimaryKey) -> Result<bool> {
        let (a, b) = ordered_pair(a, b);

        let result = query("SELECT id FROM friendships WHERE user_a = $1 AND user_b = $2")
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SqlxError::RowNotFound) => Ok(false),
            Err(e) => Err(e.any()),
        }
    }

    async fn list_friends(&self, user_id: PrimaryKey) -> Result<Vec<UserData>> {
        let rows = query_as::<_, UserRow>(
            "SELECT u.* FROM users u
                INNER JOIN friendships f
                ON (f.user_a = $1 AND u.id = f.user_b) OR (f.user_b = $1 AND u.id = f.user_a)
             ORDER BY u.display_name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_friendship(&self, a: PrimaryKey, b: PrimaryKey) -> Result<()> {
        let (a, b) = ordered_pair(a, b);

        let result = query("DELETE FROM friendships WHERE user_a = $1 AND user_b = $2")
            .bind(a)
            .bind(b)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "friendship",
                identifier: "user:user",
            });
        }

        Ok(())
    }

    async fn notification_by_id(&self, notification_id: PrimaryKey) -> Result<NotificationData> {
        query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = $1")
            .bind(notification_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("notification", "id"))
    }

    async fn list_notifications(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>> {
        let rows = query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_notification(
        &self,
        new_notification: NewNotification,
    ) -> Result<NotificationData> {
        let row = query_as::<_, NotificationRow>(
            "INSERT INTO notifications (user_id, kind, actor_id, course_id)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(new_notification.user_id)
        .bind(new_notification.kind.as_str())
        .bind(new_notification.actor_id)
        .bind(new_notification.course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.into())
    }

    async fn set_notification_status(
        &self,
        notification_id: PrimaryKey,
        status: NotificationStatus,
    ) -> Result<()> {
        let result = query("UPDATE notifications SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "notification",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: PrimaryKey) -> Result<()> {
        query("UPDATE notifications SET status = 'read' WHERE user_id = $1 AND status = 'unread'")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn invitation_by_id(&self, invitation_id: PrimaryKey) -> Result<InvitationData> {
        query_as::<_, InvitationRow>("SELECT * FROM course_invitations WHERE id = $1")
            .bind(invitation_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("course invitation", "id"))
    }

    async fn create_invitation(&self, new_invitation: NewInvitation) -> Result<InvitationData> {
        let row = query_as::<_, InvitationRow>(
            "INSERT INTO course_invitations (course_id, inviter_id, invitee_id, notification_id)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(new_invitation.course_id)
        .bind(new_invitation.inviter_id)
        .bind(new_invitation.invitee_id)
        .bind(new_invitation.notification_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.into())
    }

    async fn accept_invitation(
        &self,
        invitation_id: PrimaryKey,
        copy: NewCourse,
    ) -> Result<CourseData> {
        let invitation = self.invitation_by_id(invitation_id).await?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let course_id = insert_course(&mut tx, &copy).await?;

        query("UPDATE course_invitations SET consumed = true WHERE id = $1")
            .bind(invitation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("UPDATE notifications SET status = 'accepted' WHERE id = $1")
            .bind(invitation.notification_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        self.course_by_id(course_id).await
    }

    async fn decline_invitation(&self, invitation_id: PrimaryKey) -> Result<()> {
        let invitation = self.invitation_by_id(invitation_id).await?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        query("UPDATE course_invitations SET consumed = true WHERE id = $1")
            .bind(invitation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("UPDATE notifications SET status = 'declined' WHERE id = $1")
            .bind(invitation.notification_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())
    }

    async fn marketplace_course_by_id(
        &self,
        listing_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData> {
        let row =
            query_as::<_, MarketplaceCourseRow>("SELECT * FROM marketplace_courses WHERE id = $1")
                .bind(listing_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.not_found_or("marketplace course", "id"))?;

        let liked_by = self.listing_likes(listing_id).await?;

        Ok(self.assemble_listing(row, liked_by))
    }

    async fn marketplace_course_by_course_id(
        &self,
        course_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData> {
        let row = query_as::<_, MarketplaceCourseRow>(
            "SELECT * FROM marketplace_courses WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("marketplace course", "course_id"))?;

        let liked_by = self.listing_likes(row.id).await?;

        Ok(self.assemble_listing(row, liked_by))
    }

    async fn list_marketplace_courses(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<MarketplaceCourseData>> {
        let rows = match category {
            Some(category) => {
                query_as::<_, MarketplaceCourseRow>(
                    "SELECT * FROM marketplace_courses WHERE category = $1 ORDER BY published_at DESC",
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                query_as::<_, MarketplaceCourseRow>(
                    "SELECT * FROM marketplace_courses ORDER BY published_at DESC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| e.any())?;

        let mut listings = Vec::with_capacity(rows.len());

        for row in rows {
            let liked_by = self.listing_likes(row.id).await?;
            listings.push(self.assemble_listing(row, liked_by));
        }

        Ok(listings)
    }

    async fn create_marketplace_course(
        &self,
        new_listing: NewMarketplaceCourse,
    ) -> Result<MarketplaceCourseData> {
        self.marketplace_course_by_course_id(new_listing.course_id)
            .await
            .conflict_or_ok(
                "marketplace course",
                "course_id",
                &new_listing.course_id.to_string(),
            )?;

        let listing_id = query_scalar::<_, PrimaryKey>(
            "INSERT INTO marketplace_courses (course_id, publisher_id, category, title, topic, snapshot)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(new_listing.course_id)
        .bind(new_listing.publisher_id)
        .bind(&new_listing.category)
        .bind(&new_listing.snapshot.title)
        .bind(&new_listing.snapshot.topic)
        .bind(Json(&new_listing.snapshot))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.marketplace_course_by_id(listing_id).await
    }

    async fn toggle_marketplace_like(
        &self,
        listing_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData> {
        // Ensure the listing exists before touching likes
        let _ = self.marketplace_course_by_id(listing_id).await?;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let existing =
            query("SELECT id FROM marketplace_likes WHERE listing_id = $1 AND user_id = $2")
                .bind(listing_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await;

        match existing {
            Ok(_) => {
                query("DELETE FROM marketplace_likes WHERE listing_id = $1 AND user_id = $2")
                    .bind(listing_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;

                query("UPDATE marketplace_courses SET likes = likes - 1 WHERE id = $1")
                    .bind(listing_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;
            }
            Err(SqlxError::RowNotFound) => {
                query("INSERT INTO marketplace_likes (listing_id, user_id) VALUES ($1, $2)")
                    .bind(listing_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;

                query("UPDATE marketplace_courses SET likes = likes + 1 WHERE id = $1")
                    .bind(listing_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;
            }
            Err(e) => return Err(e.any()),
        }

        tx.commit().await.map_err(|e| e.any())?;

        self.marketplace_course_by_id(listing_id).await
    }

    async fn whiteboard_by_id(&self, whiteboard_id: PrimaryKey) -> Result<WhiteboardData> {
        query_as::<_, WhiteboardRow>("SELECT * FROM whiteboards WHERE id = $1")
            .bind(whiteboard_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("whiteboard", "id"))
    }

    async fn list_whiteboards_by_user(&self, user_id: PrimaryKey) -> Result<Vec<WhiteboardData>> {
        let rows = query_as::<_, WhiteboardRow>(
            "SELECT * FROM whiteboards WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_whiteboard(&self, new_whiteboard: NewWhiteboard) -> Result<WhiteboardData> {
        let row = query_as::<_, WhiteboardRow>(
            "INSERT INTO whiteboards (room_id, title, user_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new_whiteboard.room_id)
        .bind(&new_whiteboard.title)
        .bind(new_whiteboard.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(row.into())
    }

    async fn delete_whiteboard(&self, whiteboard_id: PrimaryKey) -> Result<()> {
        // Ensure whiteboard exists
        let _ = self.whiteboard_by_id(whiteboard_id).await?;

        query("DELETE FROM whiteboards WHERE id = $1")
            .bind(whiteboard_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendship_pairs_are_normalized() {
        assert_eq!(ordered_pair(7, 3), (3, 7));
        assert_eq!(ordered_pair(3, 7), (3, 7));
    }
}
