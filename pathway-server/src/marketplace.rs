use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{PublishCourseSchema, ValidatedJson},
    serialized::{Course, MarketplaceCourse, ToSerialized},
    Router,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    /// Restrict the listing to one category
    pub category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/marketplace",
    tag = "marketplace",
    params(ListingFilter),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<MarketplaceCourse>)
    )
)]
async fn list_marketplace(
    _session: Session,
    State(context): State<ServerContext>,
    Query(filter): Query<ListingFilter>,
) -> ServerResult<Json<Vec<MarketplaceCourse>>> {
    let listings = context
        .platform
        .marketplace
        .list(filter.category.as_deref())
        .await?;

    Ok(Json(listings.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/marketplace/{id}",
    tag = "marketplace",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MarketplaceCourse)
    )
)]
async fn listing(
    _session: Session,
    State(context): State<ServerContext>,
    Path(listing_id): Path<i32>,
) -> ServerResult<Json<MarketplaceCourse>> {
    let listing = context.platform.marketplace.listing_by_id(listing_id).await?;

    Ok(Json(listing.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/marketplace",
    tag = "marketplace",
    request_body = PublishCourseSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MarketplaceCourse),
        (status = 409, description = "The course is already published")
    )
)]
async fn publish(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<PublishCourseSchema>,
) -> ServerResult<Json<MarketplaceCourse>> {
    let listing = context
        .platform
        .marketplace
        .publish(session.user().id, body.course_id, &body.category)
        .await?;

    Ok(Json(listing.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/marketplace/{id}/like",
    tag = "marketplace",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MarketplaceCourse)
    )
)]
async fn toggle_like(
    session: Session,
    State(context): State<ServerContext>,
    Path(listing_id): Path<i32>,
) -> ServerResult<Json<MarketplaceCourse>> {
    let listing = context
        .platform
        .marketplace
        .toggle_like(session.user().id, listing_id)
        .await?;

    Ok(Json(listing.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/marketplace/{id}/import",
    tag = "marketplace",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course),
        (status = 429, description = "The course creation quota is exhausted")
    )
)]
async fn import(
    session: Session,
    State(context): State<ServerContext>,
    Path(listing_id): Path<i32>,
) -> ServerResult<Json<Course>> {
    let course = context
        .platform
        .marketplace
        .import(session.user().id, listing_id)
        .await?;

    Ok(Json(course.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_marketplace))
        .route("/", post(publish))
        .route("/:id", get(listing))
        .route("/:id/like", post(toggle_like))
        .route("/:id/import", post(import))
}
