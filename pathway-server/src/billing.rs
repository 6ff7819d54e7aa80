use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{RenewalSchema, ValidatedJson},
    serialized::{CheckoutSession, ToSerialized, User},
    Router,
};

/// The header the billing provider signs webhook deliveries with
const SIGNATURE_HEADER: &str = "stripe-signature";

#[utoipa::path(
    post,
    path = "/v1/billing/checkout",
    tag = "billing",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = CheckoutSession)
    )
)]
async fn create_checkout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<CheckoutSession>> {
    let checkout = context
        .platform
        .billing
        .create_checkout(session.user().id)
        .await?;

    Ok(Json(checkout.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/billing/webhook",
    tag = "billing",
    responses(
        (status = 200, description = "The event was applied or ignored"),
        (status = 400, description = "The signature or payload was invalid")
    )
)]
async fn webhook(
    State(context): State<ServerContext>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<StatusCode> {
    // The signature covers the exact payload bytes, so this handler never
    // parses before verifying
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::InvalidSignature)?;

    context.platform.billing.handle_webhook(&body, signature).await?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/v1/billing/sync",
    tag = "billing",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn sync_subscription(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<User>> {
    let user = context
        .platform
        .billing
        .sync_subscription(session.user().id)
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/billing/renewal",
    tag = "billing",
    request_body = RenewalSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn toggle_renewal(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RenewalSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .platform
        .billing
        .toggle_renewal(session.user().id, body.cancel_at_period_end)
        .await?;

    Ok(Json(user.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/webhook", post(webhook))
        .route("/sync", post(sync_subscription))
        .route("/renewal", post(toggle_renewal))
}
