use std::sync::Arc;

use axum::extract::FromRef;

use pathway_collab::{PgDatabase, Platform};
use pathway_impls::OpenAiGenerator;

use crate::sse::ServerSentEvents;

/// The concrete platform this server runs against.
pub type AppPlatform = Platform<OpenAiGenerator, PgDatabase>;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub platform: Arc<AppPlatform>,
    pub sse: Arc<ServerSentEvents>,
}
