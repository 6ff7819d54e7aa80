mod auth;
mod billing;
mod courses;
mod db;
mod events;
mod marketplace;
mod plan;
mod social;
mod util;
mod whiteboards;

use std::{sync::Arc, thread};

use crossbeam::channel::unbounded;
use dashmap::DashMap;

pub use auth::*;
pub use billing::*;
pub use courses::*;
pub use db::*;
pub use events::*;
pub use marketplace::*;
pub use plan::*;
pub use social::*;
pub use whiteboards::*;

use pathway_core::{Generator, GenerationId, Pipeline};

/// Who a tracked generation belongs to, so pipeline events can be routed.
#[derive(Debug, Clone)]
pub struct GenerationInfo {
    pub user_id: PrimaryKey,
    pub topic: String,
}

/// The pathway platform system, facilitating course generation, the social
/// graph, authentication, billing state, and more.
pub struct Platform<G, Db> {
    context: PlatformContext<G, Db>,
    event_receiver: EventReceiver,

    pub auth: Auth<Db>,
    pub courses: CourseManager<G, Db>,
    pub social: SocialManager<G, Db>,
    pub marketplace: MarketplaceManager<G, Db>,
    pub billing: BillingManager<G, Db>,
    pub whiteboards: WhiteboardManager<G, Db>,
}

/// A type passed to the platform's managers, to access state, emit events,
/// and reach the external collaborators.
pub struct PlatformContext<G, Db> {
    pub pipeline: Arc<Pipeline<G>>,
    pub database: Arc<Db>,
    pub billing_gateway: Arc<dyn BillingGateway>,
    pub realtime: Arc<dyn RealtimeBackend>,

    /// Generations currently running, keyed by their pipeline id
    pub active_generations: Arc<DashMap<GenerationId, GenerationInfo>>,

    event_sender: EventSender,
}

impl<G, Db> Platform<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub fn new(
        pipeline: Pipeline<G>,
        database: Db,
        billing_gateway: Arc<dyn BillingGateway>,
        realtime: Arc<dyn RealtimeBackend>,
        billing_config: BillingConfig,
    ) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = PlatformContext {
            pipeline: Arc::new(pipeline),
            database: Arc::new(database),
            billing_gateway,
            realtime,
            active_generations: Default::default(),
            event_sender,
        };

        Self::forward_pipeline_events(&context);

        let auth = Auth::new(&context.database);
        let courses = CourseManager::new(&context);
        let social = SocialManager::new(&context);
        let marketplace = MarketplaceManager::new(&context);
        let billing = BillingManager::new(&context, billing_config);
        let whiteboards = WhiteboardManager::new(&context);

        Self {
            context,
            event_receiver,
            auth,
            courses,
            social,
            marketplace,
            billing,
            whiteboards,
        }
    }

    /// Returns a receiver for platform events. Receivers share one stream.
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }

    pub fn context(&self) -> &PlatformContext<G, Db> {
        &self.context
    }

    /// Converts raw pipeline events into platform events on a dedicated
    /// thread, for as long as the platform lives.
    fn forward_pipeline_events(context: &PlatformContext<G, Db>) {
        let context = context.clone();
        let pipeline_events = context.pipeline.events();

        thread::spawn(move || {
            for event in pipeline_events.iter() {
                if let Some(converted) = CollabEvent::from_pipeline_event(&context, event) {
                    context.emit(converted);
                }
            }
        });
    }
}

impl<G, Db> PlatformContext<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub(crate) fn emit(&self, event: CollabEvent) {
        let _ = self.event_sender.send(event);
    }
}

impl<G, Db> Clone for PlatformContext<G, Db>
where
    G: Generator,
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            database: self.database.clone(),
            billing_gateway: self.billing_gateway.clone(),
            realtime: self.realtime.clone(),
            active_generations: self.active_generations.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
