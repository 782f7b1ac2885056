use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use racecard::adapters::{AdapterContext, AdapterRegistry, register_builtin_adapters};
use racecard::cache::MemoryCache;
use racecard::config::{PipelineConfig, SourceEndpoints};
use racecard::fetch::FetchClient;
use racecard::pipeline::{EventFilter, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing();

    let config = PipelineConfig::from_env()?;
    let endpoints = SourceEndpoints::from_env()?;

    eprintln!("🏇 Racecard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Priority: {}",
        if config.source_priority.is_empty() {
            "(none)".to_string()
        } else {
            config.source_priority.join(" > ")
        }
    );

    let client = FetchClient::new(&config.retry)?;
    let mut context = AdapterContext::new(client, endpoints.clone());
    if let Some(ttl) = env_parse::<u64>("RACECARD_CACHE_TTL_SECS")? {
        context = context.with_cache(MemoryCache::new(), Duration::from_secs(ttl));
        eprintln!("   Cache TTL: {}s", ttl);
    }

    let mut registry = AdapterRegistry::new();
    register_builtin_adapters(&mut registry, &endpoints)?;
    eprintln!("   Adapters: {}", registry.ids().join(", "));

    let mut filter = EventFilter::default();
    if let Some(min) = env_parse::<usize>("RACECARD_MIN_RUNNERS")? {
        filter = filter.min_participants(min);
    }
    let selection = std::env::var("RACECARD_ADAPTER").ok();

    let orchestrator = Orchestrator::new(config, registry, context);
    let output = orchestrator.run(selection.as_deref(), &filter).await?;

    let report = serde_json::json!({
        "run_id": output.run_id,
        "started_at": output.started_at,
        "statuses": output.statuses,
        "events": output.records(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    let failed = output.statuses.iter().filter(|s| !s.is_ok()).count();
    eprintln!(
        "   {} events, {} qualified, {} of {} adapters failed",
        output.events.len(),
        output.qualified().count(),
        failed,
        output.statuses.len()
    );
    Ok(())
}

/// Console logging, plus a daily rolling file when `RACECARD_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match std::env::var("RACECARD_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "racecard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    guard
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("invalid {key}: {e}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}
