//! oscreel - OSC session recorder and replayer
//!
//! Subcommands:
//! - `oscreel record` - Listen for OSC, record through a scheme, save on Ctrl-C
//! - `oscreel replay` - Send a recorded session back out with its timing

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use oscreel::{
    load, FinalizeOutcome, OscListener, PersistenceSink, RecordSettings, Recorder,
    RepeaterFanout, ReplayScheduler, ReplaySettings, Session, UdpSender,
};
use reelconf::{RecorderConfig, ReelConfig, ReplayerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "oscreel")]
#[command(about = "Record OSC traffic to JSON and replay it with its original timing")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./oscreel.toml)
    #[arg(long, global = true, env = "OSCREEL_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "oscreel=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record incoming OSC messages until interrupted
    Record(RecordArgs),

    /// Replay a recorded session
    Replay(ReplayArgs),
}

#[derive(Args)]
struct RecordArgs {
    /// IP address to listen on
    #[arg(long)]
    address: Option<String>,

    /// UDP port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Path to the output JSON file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Scheme for processing incoming messages (basic, dirt_basic, dirt_strip, only_numbers)
    #[arg(long)]
    scheme: Option<String>,

    /// Comma-separated list of ports to forward messages to
    #[arg(long)]
    repeaters: Option<String>,

    /// Start the clock at the first message (`--quantized=false` to turn off)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    quantized: Option<bool>,
}

impl RecordArgs {
    fn apply(self, config: &mut RecorderConfig) {
        if let Some(v) = self.address {
            config.listen_address = Some(v);
        }
        if let Some(v) = self.port {
            config.listen_port = Some(v);
        }
        if let Some(v) = self.file {
            config.output = Some(v);
        }
        if let Some(v) = self.scheme {
            config.scheme = Some(v);
        }
        if let Some(v) = self.repeaters {
            config.repeaters = Some(v);
        }
        if let Some(v) = self.quantized {
            config.quantized = Some(v);
        }
    }
}

#[derive(Args)]
struct ReplayArgs {
    /// JSON file with recorded messages
    #[arg(long)]
    file: Option<PathBuf>,

    /// IP address to send messages to [default: 127.0.0.1]
    #[arg(long)]
    address: Option<String>,

    /// Port to send messages to [default: 8000]
    #[arg(long)]
    port: Option<u16>,

    /// Playback speed: 2.0 = double speed, 0.5 = half speed [default: 1.0]
    #[arg(long)]
    speed: Option<f64>,
}

impl ReplayArgs {
    fn apply(self, config: &mut ReplayerConfig) {
        if let Some(v) = self.file {
            config.input = Some(v);
        }
        if let Some(v) = self.address {
            config.destination_address = v;
        }
        if let Some(v) = self.port {
            config.destination_port = v;
        }
        if let Some(v) = self.speed {
            config.speed = v;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ReelConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("oscreel: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = cli.log_level {
        config.telemetry.log_level = level;
    }
    if let Err(e) = oscreel::telemetry::init(&config.telemetry.log_level) {
        eprintln!("oscreel: {:#}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Record(args) => {
            args.apply(&mut config.recorder);
            record(&config.recorder).await
        }
        Commands::Replay(args) => {
            args.apply(&mut config.replayer);
            replay(&config.replayer).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn record(config: &RecorderConfig) -> Result<()> {
    let settings = RecordSettings::resolve(config)?;

    let fanout = RepeaterFanout::connect(&settings.listen_address, &settings.repeater_ports)
        .await
        .context("Failed to set up repeaters")?;
    for target in fanout.targets() {
        info!("Repeating to {}", target);
    }

    let listener = OscListener::bind(&settings.listen_address, settings.listen_port)
        .await
        .with_context(|| {
            format!(
                "Failed to listen on {}:{}",
                settings.listen_address, settings.listen_port
            )
        })?;

    let session = Arc::new(Session::new(settings.quantized));
    let recorder = Recorder::new(settings.scheme, session, fanout);
    let sink = PersistenceSink::new(&settings.output);

    let shutdown = CancellationToken::new();
    let _signals = oscreel::shutdown::spawn_signal_listener(shutdown.clone());

    info!(
        "Listening for OSC on {}:{} (scheme: {}, quantized: {})",
        settings.listen_address,
        settings.listen_port,
        recorder.scheme(),
        recorder.session().is_quantized()
    );
    let served = recorder.serve(listener, shutdown).await;

    // Flush whatever was captured even if the socket failed
    let outcome = recorder
        .finalize(&sink)
        .with_context(|| format!("Failed to save session to {}", sink.path().display()))?;
    if let FinalizeOutcome::Flushed(count) = outcome {
        info!("Session closed with {} messages", count);
    }

    served.context("Error receiving OSC")
}

async fn replay(config: &ReplayerConfig) -> Result<()> {
    let settings = ReplaySettings::resolve(config)?;

    let events = load(&settings.input)?;
    if events.is_empty() {
        info!("No messages found in {}. Exiting.", settings.input.display());
        return Ok(());
    }

    let sender = UdpSender::connect(&settings.destination_address, settings.destination_port)
        .await
        .with_context(|| {
            format!(
                "Failed to open sender for {}:{}",
                settings.destination_address, settings.destination_port
            )
        })?;

    let shutdown = CancellationToken::new();
    let _signals = oscreel::shutdown::spawn_signal_listener(shutdown.clone());

    let destination = sender.destination();
    let scheduler =
        ReplayScheduler::new(Arc::new(sender), settings.speed).with_cancellation(shutdown);
    info!(
        "Replaying {} messages to {} at speed factor: {:.2}",
        events.len(),
        destination,
        scheduler.speed().get()
    );
    scheduler.run(&events).await;

    Ok(())
}
