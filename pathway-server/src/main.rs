use std::sync::Arc;

use log::info;

use pathway_collab::{BillingConfig, PgDatabase, Platform};
use pathway_core::{GenerationConfig, Pipeline};
use pathway_impls::{LiveblocksBackend, OpenAiGenerator, StripeGateway};
use pathway_server::{init_logger, run_server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let config = Config::from_env();

    info!("Connecting to database...");
    let database = PgDatabase::new(&config.database_url).await?;

    let generator = match &config.openai_base_url {
        Some(base_url) => OpenAiGenerator::with_base_url(&config.openai_api_key, base_url),
        None => OpenAiGenerator::new(&config.openai_api_key),
    };

    let pipeline = Pipeline::new(
        generator,
        GenerationConfig {
            model: config.openai_model.clone(),
            pacing: config.generation_pacing,
            ..Default::default()
        },
    );

    let billing_gateway = Arc::new(StripeGateway::new(&config.stripe_secret_key));
    let realtime = Arc::new(LiveblocksBackend::new(&config.liveblocks_secret_key));

    let platform = Arc::new(Platform::new(
        pipeline,
        database,
        billing_gateway,
        realtime,
        BillingConfig {
            webhook_secret: config.stripe_webhook_secret.clone(),
            price_id: config.stripe_price_id.clone(),
            public_app_url: config.public_app_url.clone(),
        },
    ));

    run_server(platform, config.port).await;

    Ok(())
}
