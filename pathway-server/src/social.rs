use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{FriendRequestSchema, ValidatedJson},
    serialized::{Course, FriendRequest, Notification, ToSerialized, User},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/friends/requests",
    tag = "social",
    request_body = FriendRequestSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = FriendRequest)
    )
)]
async fn send_friend_request(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<FriendRequestSchema>,
) -> ServerResult<Json<FriendRequest>> {
    let request = context
        .platform
        .social
        .send_friend_request(session.user().id, &body.username)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/friends/requests/{id}/accept",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The request was accepted and the friendship created")
    )
)]
async fn accept_friend_request(
    session: Session,
    State(context): State<ServerContext>,
    Path(request_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .accept_friend_request(session.user().id, request_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/friends/requests/{id}/decline",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The request was declined")
    )
)]
async fn decline_friend_request(
    session: Session,
    State(context): State<ServerContext>,
    Path(request_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .decline_friend_request(session.user().id, request_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/friends",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>)
    )
)]
async fn list_friends(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<User>>> {
    let friends = context
        .platform
        .social
        .list_friends(session.user().id)
        .await?;

    Ok(Json(friends.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/friends/{user_id}",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The friendship was removed")
    )
)]
async fn remove_friend(
    session: Session,
    State(context): State<ServerContext>,
    Path(friend_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .remove_friend(session.user().id, friend_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Notification>)
    )
)]
async fn list_notifications(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Notification>>> {
    let notifications = context
        .platform
        .social
        .list_notifications(session.user().id)
        .await?;

    Ok(Json(notifications.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The notification was marked read")
    )
)]
async fn mark_notification_read(
    session: Session,
    State(context): State<ServerContext>,
    Path(notification_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .mark_notification_read(session.user().id, notification_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "All unread notifications were marked read")
    )
)]
async fn mark_all_read(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .mark_all_notifications_read(session.user().id)
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/invitations/{id}/accept",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course, description = "The shared course was copied to the invitee")
    )
)]
async fn accept_invitation(
    session: Session,
    State(context): State<ServerContext>,
    Path(invitation_id): Path<i32>,
) -> ServerResult<Json<Course>> {
    let course = context
        .platform
        .social
        .accept_invitation(session.user().id, invitation_id)
        .await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/invitations/{id}/decline",
    tag = "social",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The invitation was declined")
    )
)]
async fn decline_invitation(
    session: Session,
    State(context): State<ServerContext>,
    Path(invitation_id): Path<i32>,
) -> ServerResult<()> {
    context
        .platform
        .social
        .decline_invitation(session.user().id, invitation_id)
        .await?;

    Ok(())
}

pub fn friends_router() -> Router {
    Router::new()
        .route("/", get(list_friends))
        .route("/requests", post(send_friend_request))
        .route("/requests/:id/accept", post(accept_friend_request))
        .route("/requests/:id/decline", post(decline_friend_request))
        .route("/:user_id", delete(remove_friend))
}

pub fn notifications_router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", post(mark_notification_read))
        .route("/read-all", post(mark_all_read))
}

pub fn invitations_router() -> Router {
    Router::new()
        .route("/:id/accept", post(accept_invitation))
        .route("/:id/decline", post(decline_invitation))
}
