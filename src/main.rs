mod command;
mod config;
mod error;
mod executor;
mod flight;
mod logging;
mod state;
mod voice;

use command::{CommandChain, CommandKind};
use config::Config;
use executor::{CancelToken, ExecutionMachine};
use flight::sim::SimConnector;
use flight::traits::PowerHook;
use logging::{log_event, EventSink, TracingSink};
use std::sync::Arc;
use tokio::sync::mpsc;
use voice::parser::parse_utterance;
use voice::recognizer::{AudioSource, ConsoleRecognizer, SilentAudioSource, SpeechRecognizer};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Power-off hook for the embedding platform. In sim mode it only logs;
/// a deployment wires this to the host's shutdown mechanism.
struct PlatformPower;

impl PowerHook for PlatformPower {
    fn request_system_power_off(&self) {
        warn!("System power-off requested");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .try_init()?;

    let config = Config::default();
    info!("Voicepilot starting");
    info!("  connection path: {}", config.connection_path);
    info!("  sim mode: {}", config.sim_mode);

    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
    let (chain_tx, chain_rx) = mpsc::unbounded_channel::<CommandChain>();
    let cancel = Arc::new(CancelToken::default());

    // Voice pipeline producer: audio frames in, parsed chains out.
    // Runs regardless of connection state so STOP is always heard.
    let audio = SilentAudioSource::new(
        std::time::Duration::from_millis(100),
        config.noise_injection,
    );
    let recognizer = ConsoleRecognizer::new();
    {
        let defaults = config.defaults.clone();
        let sink = sink.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            voice_loop(audio, recognizer, defaults, chain_tx, cancel, sink).await;
        });
    }
    info!("Voice pipeline started (console recognizer)");

    // Hardware connectors are supplied by the embedding application;
    // this build carries the simulated vehicle.
    let connector = SimConnector;
    let control = match flight::connect_with_retry(&connector, &config).await {
        Ok(control) => control,
        Err(e) => {
            error!("Fatal: {}", e);
            log_event(&sink, format!("fatal: {}", e));
            executor::run_failsafe(chain_rx, sink).await;
            return Ok(());
        }
    };

    let power: Arc<dyn PowerHook> = Arc::new(PlatformPower);
    let mut machine = ExecutionMachine::new(control, config, chain_rx, cancel, sink, power);
    machine.run().await;

    info!("Voicepilot exiting");
    Ok(())
}

/// The recognition producer: never blocked by command execution.
///
/// STOP takes a fast path, tripping the cancel token directly so a
/// long-running movement is interrupted without waiting for the queue.
async fn voice_loop(
    mut audio: impl AudioSource,
    mut recognizer: impl SpeechRecognizer,
    defaults: config::Defaults,
    chain_tx: mpsc::UnboundedSender<CommandChain>,
    cancel: Arc<CancelToken>,
    sink: Arc<dyn EventSink>,
) {
    while let Some(frame) = audio.next_frame().await {
        let recognized = match recognizer.feed(&frame) {
            Some(r) => r,
            None => continue,
        };
        log_event(&sink, format!("recognized: '{}'", recognized.text));

        let (chain, parse_errors) =
            parse_utterance(&recognized.text, &defaults, recognized.recognized_at_ms);
        for e in &parse_errors {
            log_event(&sink, format!("parse error: {}", e));
        }
        if chain.is_empty() {
            if parse_errors.is_empty() {
                log_event(
                    &sink,
                    format!("no commands found in: '{}'", recognized.text),
                );
            }
            continue;
        }
        log_event(&sink, format!("parsed chain of {} command(s)", chain.len()));

        if chain.commands.iter().any(|c| c.kind == CommandKind::Stop) {
            cancel.trigger();
        }
        if chain_tx.send(chain).is_err() {
            // Executor gone; nothing left to feed
            break;
        }
    }
    info!("Voice pipeline stopped");
}
