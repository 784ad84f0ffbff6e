//! Application entry point: Emotion Capture.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the prediction client and the file-replay device from config.
//! 5. Create the event channel and spawn the event printer.
//! 6. Set up the capture session (binds the camera, rotates the preview).
//! 7. Read commands from stdin until `quit`, end of input or Ctrl-C, then
//!    tear the session down.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use emotion_capture::{
    app::{describe_event, dispatch, join_task, Command, Reply},
    capture::{CaptureOrchestrator, EventSink, FileReplayDevice, SessionEvent},
    config::AppConfig,
    orientation::OrientationFeed,
    predict::{HttpPredictionClient, PredictionClient},
};

// ---------------------------------------------------------------------------
// Event printer
// ---------------------------------------------------------------------------

/// Print session events as they arrive until every sender is gone.
async fn print_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = describe_event(&event) {
            println!("{line}");
        }
    }
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let client: Arc<dyn PredictionClient> = Arc::new(
        HttpPredictionClient::from_config(&config.service)
            .context("could not build the prediction client")?,
    );
    let device = Arc::new(FileReplayDevice::from_config(&config.device));

    let (events, event_rx) = EventSink::channel();
    let printer = tokio::spawn(print_events(event_rx));

    let orchestrator = CaptureOrchestrator::new(
        device,
        client,
        OrientationFeed::default(),
        config.capture.clone(),
        events,
    );

    orchestrator
        .setup()
        .await
        .context("could not start the capture session")?;
    println!("{}", Reply::Help);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut torn_down = false;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let cmd = match Command::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        // Errors are already reported through the event stream.
        let outcome = dispatch(&orchestrator, cmd).await;
        match outcome {
            Ok(reply) => {
                println!("{reply}");
                if matches!(reply, Reply::Quit(_)) {
                    torn_down = true;
                    break;
                }
            }
            Err(e) => log::debug!("command {cmd:?} failed: {e}"),
        }
    }

    if !torn_down {
        if let Err(e) = orchestrator.teardown().await {
            log::warn!("teardown: {e}");
        }
    }

    // Dropping the orchestrator closes the event channel.
    drop(orchestrator);
    join_task("event printer", printer).await;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Emotion Capture starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!("prediction service: {}", config.service.base_url);

    // 3. Tokio runtime (2 worker threads: photo loop + network)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}
