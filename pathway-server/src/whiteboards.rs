use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewWhiteboardSchema, ValidatedJson},
    serialized::{RoomToken, ToSerialized, Whiteboard},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/whiteboards",
    tag = "whiteboards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Whiteboard>)
    )
)]
async fn list_whiteboards(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Whiteboard>>> {
    let whiteboards = context
        .platform
        .whiteboards
        .list_by_user(session.user().id)
        .await?;

    Ok(Json(whiteboards.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/whiteboards",
    tag = "whiteboards",
    request_body = NewWhiteboardSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Whiteboard),
        (status = 429, description = "The lifetime whiteboard cap is reached")
    )
)]
async fn create_whiteboard(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewWhiteboardSchema>,
) -> ServerResult<Json<Whiteboard>> {
    let whiteboard = context
        .platform
        .whiteboards
        .create_whiteboard(session.user().id, &body.title)
        .await?;

    Ok(Json(whiteboard.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/whiteboards/{id}/session",
    tag = "whiteboards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = RoomToken, description = "A realtime room session token")
    )
)]
async fn authorize_session(
    session: Session,
    State(context): State<ServerContext>,
    Path(whiteboard_id): Path<i32>,
) -> ServerResult<Json<RoomToken>> {
    let token = context
        .platform
        .whiteboards
        .authorize_session(session.user().id, whiteboard_id)
        .await?;

    Ok(Json(token.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/whiteboards/{id}",
    tag = "whiteboards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The whiteboard was deleted")
    )
)]
async fn delete_whiteboard(
    session: Session,
    State(context): State<ServerContext>,
    Path(whiteboard_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .whiteboards
        .delete_whiteboard(session.user().id, whiteboard_id)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_whiteboards))
        .route("/", post(create_whiteboard))
        .route("/:id", delete(delete_whiteboard))
        .route("/:id/session", post(authorize_session))
}
