use async_trait::async_trait;
use log::info;
use serde_json::json;
use thiserror::Error;

use pathway_core::Generator;

use crate::{
    check_whiteboard_limit, util::random_string, Database, DatabaseError, LimitDecision,
    NewWhiteboard, PlatformContext, PrimaryKey, WhiteboardData,
};

#[derive(Debug, Error)]
pub enum WhiteboardError {
    /// The lifetime whiteboard cap is reached
    #[error("Whiteboard creation limit reached")]
    LimitExceeded(LimitDecision),
    /// The acting user doesn't own the whiteboard
    #[error("Only the whiteboard owner may do this")]
    NotOwner,
    /// The realtime provider could not be reached or rejected the request
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

#[derive(Debug, Error)]
#[error("realtime provider request failed: {0}")]
pub struct RealtimeError(pub String);

/// The user identity handed to the realtime provider for presence.
#[derive(Debug, Clone)]
pub struct RealtimeUser {
    pub id: String,
    pub name: String,
}

/// A session token granting access to one realtime room.
#[derive(Debug, Clone)]
pub struct RoomToken {
    pub token: String,
}

/// Represents a type that can manage rooms at the realtime provider.
/// All conflict resolution for shared drawing state happens there.
#[async_trait]
pub trait RealtimeBackend: Send + Sync + 'static {
    async fn create_room(
        &self,
        room_id: &str,
        initial_storage: &serde_json::Value,
    ) -> Result<(), RealtimeError>;
    async fn authorize(&self, room_id: &str, user: &RealtimeUser)
        -> Result<RoomToken, RealtimeError>;
}

/// The storage shape a fresh whiteboard room starts with.
pub fn initial_storage() -> serde_json::Value {
    json!({ "layers": {}, "layerIds": [] })
}

pub struct WhiteboardManager<G, Db> {
    context: PlatformContext<G, Db>,
}

impl<G, Db> WhiteboardManager<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub fn new(context: &PlatformContext<G, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// The user's current whiteboard quota snapshot.
    pub async fn check_limit(&self, user_id: PrimaryKey) -> Result<LimitDecision, DatabaseError> {
        let user = self.context.database.user_by_id(user_id).await?;

        Ok(check_whiteboard_limit(user.tier(), user.whiteboards_created))
    }

    /// Creates a whiteboard: the realtime room is set up with the initial
    /// storage shape, then the record is stored and the lifetime counter
    /// bumped.
    pub async fn create_whiteboard(
        &self,
        user_id: PrimaryKey,
        title: &str,
    ) -> Result<WhiteboardData, WhiteboardError> {
        let user = self.context.database.user_by_id(user_id).await?;

        let decision = check_whiteboard_limit(user.tier(), user.whiteboards_created);
        if !decision.allowed {
            return Err(WhiteboardError::LimitExceeded(decision));
        }

        let room_id = format!("whiteboard-{}", random_string(16).to_lowercase());

        self.context
            .realtime
            .create_room(&room_id, &initial_storage())
            .await?;

        let whiteboard = self
            .context
            .database
            .create_whiteboard(NewWhiteboard {
                room_id,
                title: title.to_string(),
                user_id,
            })
            .await?;

        self.context
            .database
            .increment_whiteboards_created(user_id)
            .await?;

        info!("User {} created whiteboard \"{title}\"", user.display_name);

        Ok(whiteboard)
    }

    pub async fn list_by_user(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<WhiteboardData>, DatabaseError> {
        self.context.database.list_whiteboards_by_user(user_id).await
    }

    /// Issues a realtime room token. The owner and their friends may join;
    /// drawing together is the point.
    pub async fn authorize_session(
        &self,
        user_id: PrimaryKey,
        whiteboard_id: PrimaryKey,
    ) -> Result<RoomToken, WhiteboardError> {
        let whiteboard = self.context.database.whiteboard_by_id(whiteboard_id).await?;

        if whiteboard.user_id != user_id {
            let befriended = self
                .context
                .database
                .friendship_exists(whiteboard.user_id, user_id)
                .await?;

            if !befriended {
                return Err(WhiteboardError::NotOwner);
            }
        }

        let user = self.context.database.user_by_id(user_id).await?;

        let token = self
            .context
            .realtime
            .authorize(
                &whiteboard.room_id,
                &RealtimeUser {
                    id: user.id.to_string(),
                    name: user.display_name,
                },
            )
            .await?;

        Ok(token)
    }

    pub async fn delete_whiteboard(
        &self,
        user_id: PrimaryKey,
        whiteboard_id: PrimaryKey,
    ) -> Result<(), WhiteboardError> {
        let whiteboard = self.context.database.whiteboard_by_id(whiteboard_id).await?;

        if whiteboard.user_id != user_id {
            return Err(WhiteboardError::NotOwner);
        }

        self.context.database.delete_whiteboard(whiteboard_id).await?;

        Ok(())
    }
}
