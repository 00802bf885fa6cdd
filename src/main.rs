use std::error::Error;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use trial_match::config::{LoggingSettings, Settings};
use trial_match::core::Ranker;
use trial_match::services::{FileStore, HealthCheck, TrialApiClient};
use trial_match::session::{SearchOutcome, TrialSearchOrchestrator};

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    init_logging(&settings.logging);

    info!("Starting trial matching session...");

    let client = TrialApiClient::new(settings.api.base_url.clone(), settings.api.timeout())?;

    match client.check_health().await {
        Ok(health) if health.is_healthy() => info!("Search backend is healthy"),
        Ok(health) => warn!("Search backend reports status '{}'", health.status),
        Err(e) => warn!("Search backend unreachable: {}", e),
    }

    let store = FileStore::open(&settings.store.path)?;
    let ranker = Ranker::new(settings.scoring_weights());
    debug!("Scoring weights: {:?}", ranker.weights());
    let orchestrator = TrialSearchOrchestrator::new(client, store, ranker, settings.search_limits());

    match orchestrator.refresh_from_store().await {
        Ok(SearchOutcome::Ranked { count }) => {
            let snapshot = orchestrator.snapshot().await;
            info!("{} trials ranked for review", count);
            for (position, trial) in snapshot.trials.iter().enumerate() {
                info!(
                    "#{} {} {} (score {:.3})",
                    position + 1,
                    trial.id,
                    trial.title,
                    trial.match_score.unwrap_or_default()
                );
            }
        }
        Ok(outcome) => info!("No search performed: {:?}", outcome),
        Err(e) => error!("{}", e),
    }

    orchestrator.shutdown();
    Ok(())
}
