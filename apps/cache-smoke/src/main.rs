mod config;
mod logging;
mod script;

use cache_core::{IngestChannels, SharedConversationCache, run_ingest_loop};
use config::SmokeConfig;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    logging::init();
    info!("starting cache-smoke");

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    debug!(?config, "loaded configuration");

    let events = match &config.script_path {
        Some(path) => match script::load_script(path) {
            Ok(events) => events,
            Err(err) => {
                error!(%err, "failed to load event script");
                eprintln!("Failed to load event script: {err}");
                std::process::exit(1);
            }
        },
        None => script::builtin_scenario(),
    };
    info!(event_count = events.len(), "replaying events");

    let cache = SharedConversationCache::new(config.max_messages_per_chat);
    let (channels, events_rx) = IngestChannels::new(config.ingest_buffer, config.notify_buffer);
    let ingest = tokio::spawn(run_ingest_loop(
        events_rx,
        cache.clone(),
        channels.notifier(),
    ));

    for event in events {
        if let Err(err) = channels.send_event(event).await {
            error!(%err, "ingest loop stopped early");
            break;
        }
    }
    drop(channels);

    let applied = match ingest.await {
        Ok(applied) => applied,
        Err(err) => {
            error!(%err, "ingest task failed");
            std::process::exit(1);
        }
    };

    println!(
        "Applied {applied} events; active chat: {}; {} messages cached",
        cache.active_chat_id().as_deref().unwrap_or("<none>"),
        cache.total_messages()
    );
    for preview in cache.chat_previews() {
        println!(
            "{:<24} {:>4} msgs  latest: {} ({:?})",
            preview.chat_id, preview.message_count, preview.latest.body, preview.latest.status
        );
    }
}
