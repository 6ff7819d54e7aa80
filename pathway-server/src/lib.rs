mod auth;
mod billing;
mod config;
mod context;
mod courses;
mod docs;
mod errors;
mod logging;
mod marketplace;
mod schemas;
mod serialized;
mod social;
mod sse;
mod whiteboards;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
    thread,
};

use axum::routing::get;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use config::Config;
pub use context::{AppPlatform, ServerContext};
pub use logging::init_logger;

use sse::{route_event, ServerSentEvents, Target};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Starts the pathway server
pub async fn run_server(platform: Arc<AppPlatform>, port: u16) {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let sse = ServerSentEvents::new();
    forward_platform_events(&platform, &sse);

    let context = ServerContext {
        platform,
        sse: sse.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/courses", courses::router())
        .nest("/limits", courses::limits_router())
        .nest("/friends", social::friends_router())
        .nest("/notifications", social::notifications_router())
        .nest("/invitations", social::invitations_router())
        .nest("/marketplace", marketplace::router())
        .nest("/billing", billing::router())
        .nest("/whiteboards", whiteboards::router())
        .nest("/events", sse::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {port}");

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}

/// Delivers platform events to their SSE audience on a dedicated thread,
/// for as long as the platform lives.
fn forward_platform_events(platform: &Arc<AppPlatform>, sse: &Arc<ServerSentEvents>) {
    let events = platform.events();
    let sse = sse.clone();

    thread::spawn(move || {
        for event in events.iter() {
            let (target, event) = route_event(event);

            match target {
                Target::User(user_id) => sse.send_to_user(user_id, event),
                Target::All => sse.broadcast(event),
            }
        }
    });
}
