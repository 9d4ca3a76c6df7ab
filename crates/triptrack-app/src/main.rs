mod cli;
mod terminal;

use anyhow::{Context, Result};
use std::sync::mpsc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use triptrack_core::backend::{HttpBackend, InMemoryBackend, TelemetryBackend};
use triptrack_core::client::TripClient;
use triptrack_core::config::ClientConfig;
use triptrack_core::demo::SensorSimulator;
use triptrack_core::gps::{SimulatedGeolocation, SimulatedRoute};

use cli::Options;
use terminal::{is_trusted_origin, spawn_stdin_reader, LogRenderer, PromptState, TerminalHost};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    let options = cli::parse_args(&args)?;
    if options.help {
        cli::print_help();
        return Ok(());
    }

    let config = load_config(&options)?;
    tracing::info!("TripTrack {} starting", triptrack_core::VERSION);

    let geolocation = options
        .simulate_gps
        .then(|| SimulatedGeolocation::new(SimulatedRoute::default()));

    if options.demo {
        tracing::info!("Demo mode: in-process backend with simulated sensors");
        let backend = InMemoryBackend::new();
        let cancel = CancellationToken::new();
        let feeder = tokio::spawn(feed_demo_sensors(backend.clone(), cancel.clone()));
        run_client(config, backend, geolocation, true, &options).await?;
        cancel.cancel();
        let _ = feeder.await;
    } else {
        let backend = HttpBackend::from_config(&config)
            .with_context(|| format!("cannot use backend URL '{}'", config.base_url))?;
        let base = backend.base_url();
        let secure = is_trusted_origin(base.scheme(), base.host_str());
        tracing::info!("Backend: {}", base);
        run_client(config, backend, geolocation, secure, &options).await?;
    }

    Ok(())
}

fn load_config(options: &Options) -> Result<ClientConfig> {
    let mut config = match &options.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    }
    .apply_env();

    if let Some(url) = &options.url {
        config.base_url = url.clone();
    }
    if options.insecure {
        config.accept_invalid_certs = true;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run_client<B: TelemetryBackend>(
    config: ClientConfig,
    backend: B,
    geolocation: Option<SimulatedGeolocation>,
    secure: bool,
    options: &Options,
) -> Result<()> {
    if !secure {
        tracing::warn!("Backend is neither HTTPS nor loopback; GPS may be refused");
    }

    let prompt = PromptState::default();
    let (answers_tx, answers_rx) = mpsc::channel();
    let host = TerminalHost::new(secure, options.assume_yes, prompt.clone(), answers_rx);

    let (client, handle) = TripClient::new(config, backend, geolocation, LogRenderer::new(), host);
    let client_task = tokio::spawn(client.run());

    // Detached: the thread blocks on stdin and ends with the process
    let _stdin = spawn_stdin_reader(handle.clone(), prompt, answers_tx);
    tracing::info!("Type 'r' + Enter to reset the trip, Ctrl-C to quit");

    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            ctrl_c_handle.shutdown();
        }
    });

    let client = client_task.await.context("client task failed")?;
    let state = client.state();
    tracing::info!(
        "Session ended: max speed {:.0} km/h, GPS {}",
        state.max_speed.value(),
        state.gps_status()
    );
    Ok(())
}

/// Push simulated wheel-sensor readings into the demo backend once a second
async fn feed_demo_sensors(backend: InMemoryBackend, cancel: CancellationToken) {
    let mut sim = SensorSimulator::new();
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let report = sim.update(elapsed_ms);
                if let Err(e) = backend.push_sensor_data(report).await {
                    tracing::warn!("Demo sensor push failed: {}", e);
                }
            }
        }
    }
}
