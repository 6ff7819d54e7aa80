use axum::{
    extract::{Path, State},
    routing::{delete, get, patch, post},
    Json,
};
use pathway_collab::{check_whiteboard_limit, NewCourseRequest};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        NewCourseSchema, QuizAnswersSchema, ShareCourseSchema, StepCompletionSchema,
        UpdateNotesSchema, ValidatedJson,
    },
    serialized::{Course, Limits, QuizQuestion, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/courses",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Course>)
    )
)]
async fn list_courses(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Course>>> {
    let courses = context
        .platform
        .courses
        .list_by_user(session.user().id)
        .await?;

    Ok(Json(courses.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/courses/{id}",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course)
    )
)]
async fn course(
    _session: Session,
    State(context): State<ServerContext>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Course>> {
    let course = context.platform.courses.course_by_slug(&slug).await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/courses",
    tag = "courses",
    request_body = NewCourseSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course),
        (status = 422, description = "The topic was rejected or generation failed"),
        (status = 429, description = "The course creation quota is exhausted")
    )
)]
async fn create_course(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewCourseSchema>,
) -> ServerResult<Json<Course>> {
    let course = context
        .platform
        .courses
        .create_course(
            session.user().id,
            NewCourseRequest {
                topic: body.topic,
                knowledge_level: body.knowledge_level,
                depth: body.depth.into(),
                mode: body.mode.into(),
                public: body.public,
            },
        )
        .await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/courses/{id}/notes",
    tag = "courses",
    request_body = UpdateNotesSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course)
    )
)]
async fn update_notes(
    session: Session,
    State(context): State<ServerContext>,
    Path(course_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateNotesSchema>,
) -> ServerResult<Json<Course>> {
    let course = context
        .platform
        .courses
        .update_notes(session.user().id, course_id, &body.notes)
        .await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/courses/{id}/steps/{ordinal}/complete",
    tag = "courses",
    request_body = StepCompletionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The step's completion flag was set")
    )
)]
async fn set_step_completed(
    session: Session,
    State(context): State<ServerContext>,
    Path((course_id, ordinal)): Path<(i32, i32)>,
    ValidatedJson(body): ValidatedJson<StepCompletionSchema>,
) -> ServerResult<()> {
    context
        .platform
        .courses
        .set_step_completed(session.user().id, course_id, ordinal, body.completed)
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/courses/{id}/steps/{ordinal}/quiz",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<QuizQuestion>)
    )
)]
async fn generate_quiz(
    session: Session,
    State(context): State<ServerContext>,
    Path((course_id, ordinal)): Path<(i32, i32)>,
) -> ServerResult<Json<Vec<QuizQuestion>>> {
    let quiz = context
        .platform
        .courses
        .generate_quiz(session.user().id, course_id, ordinal)
        .await?;

    Ok(Json(quiz.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/courses/{id}/steps/{ordinal}/quiz/answers",
    tag = "courses",
    request_body = QuizAnswersSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<QuizQuestion>)
    )
)]
async fn submit_quiz(
    session: Session,
    State(context): State<ServerContext>,
    Path((course_id, ordinal)): Path<(i32, i32)>,
    ValidatedJson(body): ValidatedJson<QuizAnswersSchema>,
) -> ServerResult<Json<Vec<QuizQuestion>>> {
    let quiz = context
        .platform
        .courses
        .submit_quiz(session.user().id, course_id, ordinal, &body.answers)
        .await?;

    Ok(Json(quiz.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/courses/{id}/share",
    tag = "courses",
    request_body = ShareCourseSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The course was shared with the friend")
    )
)]
async fn share_course(
    session: Session,
    State(context): State<ServerContext>,
    Path(course_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<ShareCourseSchema>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .share_course(session.user().id, course_id, body.friend_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    delete,
    path = "/v1/courses/{id}",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The course was deleted")
    )
)]
async fn delete_course(
    session: Session,
    State(context): State<ServerContext>,
    Path(course_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .courses
        .delete_course(session.user().id, course_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/limits",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Limits)
    )
)]
async fn limits(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Limits>> {
    let user = session.user();

    let course = context.platform.courses.check_limit(user.id).await?;
    let whiteboard = check_whiteboard_limit(user.tier(), user.whiteboards_created);

    Ok(Json(Limits {
        course: course.to_serialized(),
        whiteboard: whiteboard.to_serialized(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_courses))
        .route("/", post(create_course))
        .route("/:id", get(course))
        .route("/:id", delete(delete_course))
        .route("/:id/notes", patch(update_notes))
        .route("/:id/steps/:ordinal/complete", post(set_step_completed))
        .route("/:id/steps/:ordinal/quiz", post(generate_quiz))
        .route("/:id/steps/:ordinal/quiz/answers", post(submit_quiz))
        .route("/:id/share", post(share_course))
}

pub fn limits_router() -> Router {
    Router::new().route("/", get(limits))
}
