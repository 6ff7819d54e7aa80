use std::{
    collections::VecDeque,
    convert::Infallible,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll, Waker},
};

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use futures_util::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use pathway_collab::{CollabEvent, PrimaryKey};
use pathway_core::{Id, Stage};

use crate::{
    context::ServerContext,
    serialized::{Notification, ToSerialized},
    Router,
};

type ConnectionId = Id<Connection>;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A course generation moved into a new stage.
    GenerationStageStarted { topic: String, stage: String },
    /// One step of a course generation finished.
    GenerationStepFinished {
        topic: String,
        ordinal: u32,
        title: String,
    },
    /// A course generation produced a course.
    GenerationCompleted { topic: String, step_count: usize },
    /// A course generation aborted.
    GenerationFailed { topic: String, error: String },
    /// A notification landed in the connected user's inbox.
    Notification { notification: Notification },
    /// A course was published to the marketplace.
    ListingPublished { title: String, category: String },
}

/// Who an event is for.
pub enum Target {
    User(PrimaryKey),
    All,
}

/// Splits a platform event into its audience and its wire form.
pub fn route_event(event: CollabEvent) -> (Target, ServerEvent) {
    match event {
        CollabEvent::GenerationStageStarted {
            user_id,
            topic,
            stage,
        } => (
            Target::User(user_id),
            ServerEvent::GenerationStageStarted {
                topic,
                stage: stage_name(stage).to_string(),
            },
        ),
        CollabEvent::GenerationStepFinished {
            user_id,
            topic,
            ordinal,
            title,
        } => (
            Target::User(user_id),
            ServerEvent::GenerationStepFinished {
                topic,
                ordinal,
                title,
            },
        ),
        CollabEvent::GenerationCompleted {
            user_id,
            topic,
            step_count,
        } => (
            Target::User(user_id),
            ServerEvent::GenerationCompleted { topic, step_count },
        ),
        CollabEvent::GenerationFailed {
            user_id,
            topic,
            error,
        } => (
            Target::User(user_id),
            ServerEvent::GenerationFailed { topic, error },
        ),
        CollabEvent::NotificationCreated {
            user_id,
            notification,
        } => (
            Target::User(user_id),
            ServerEvent::Notification {
                notification: notification.to_serialized(),
            },
        ),
        CollabEvent::ListingPublished { title, category } => {
            (Target::All, ServerEvent::ListingPublished { title, category })
        }
    }
}

fn stage_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Validation => "validation",
        Stage::Title => "title",
        Stage::Outline => "outline",
        Stage::Content => "content",
        Stage::Quiz => "quiz",
    }
}

/// Manages server sent event connections
pub struct ServerSentEvents {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    /// The authenticated user behind the connection, if any. Targeted
    /// events only reach connections carrying their user.
    user_id: Option<PrimaryKey>,
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
        })
    }

    pub fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter() {
            connection.send(event.clone())
        }
    }

    pub fn send_to_user(&self, user_id: PrimaryKey, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter().filter(|c| c.user_id == Some(user_id)) {
            connection.send(event.clone())
        }
    }

    fn connect(&self, user_id: Option<PrimaryKey>) -> ConnectionHandle {
        let connection = Connection::new(user_id);
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }
}

impl Connection {
    fn new(user_id: Option<PrimaryKey>) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push_back(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        let next_event = pending_messages
            .pop_front()
            .map(|m| serde_json::to_string(&m).expect("serializes properly"));

        if let Some(event) = next_event {
            return Poll::Ready(Some(Ok(Event::default().data(event))));
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

/// EventSource can't set headers, so the session rides in as a query param
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventStreamParams {
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    params(EventStreamParams),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of events from pathway",
            body = ServerEvent
        )
    )
)]
async fn event_stream(
    State(context): State<ServerContext>,
    Query(params): Query<EventStreamParams>,
) -> Sse<ConnectionHandle> {
    let user_id = match params.token {
        Some(token) => context
            .platform
            .auth
            .session(&token)
            .await
            .ok()
            .map(|s| s.user.id),
        None => None,
    };

    Sse::new(context.sse.connect(user_id)).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}
