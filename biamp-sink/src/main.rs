//! Biamp Sink - main entry point
//!
//! Wires the pipeline, the control pollers, and the collaborator seams
//! into a running daemon. Decoded 16-bit little-endian PCM is fed on
//! stdin (standing in for the transport's data callback), the two bands
//! come out on their configured output devices, and the physical controls
//! poll the configured GPIO value files.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biamp_common::config::SinkConfig;
use biamp_common::events::EventBus;
use biamp_sink::audio::output::{CpalSink, PcmSink};
use biamp_sink::audio::types::MAX_FRAME_BYTES;
use biamp_sink::controls::button::{run_button_task, ButtonDecoder, GestureTiming};
use biamp_sink::controls::encoder::EncoderDecoder;
use biamp_sink::controls::gpio::{InputLine, OutputLine, SysfsInput, SysfsOutput};
use biamp_sink::remote::LogRemote;
use biamp_sink::session::{
    ConnectionState, EncoderFactory, PanelOutputs, Session, SinkFactory,
};
use biamp_sink::state::SharedState;

/// Command-line arguments for biamp-sink
#[derive(Parser, Debug)]
#[command(name = "biamp-sink")]
#[command(about = "Two-band Bluetooth audio sink")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "BIAMP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bass output device
    #[arg(long, env = "BIAMP_BASS_DEVICE")]
    bass_device: Option<String>,

    /// Override the mid output device
    #[arg(long, env = "BIAMP_MID_DEVICE")]
    mid_device: Option<String>,

    /// Power the session on at startup instead of waiting for the button
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biamp_sink=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config =
        SinkConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    if args.bass_device.is_some() {
        config.audio.bass_device = args.bass_device.clone();
    }
    if args.mid_device.is_some() {
        config.audio.mid_device = args.mid_device.clone();
    }

    info!("Starting biamp audio sink");

    let state = Arc::new(SharedState::new(EventBus::new(100)));
    let remote = Arc::new(LogRemote);

    let bass_name = config.audio.bass_device.clone();
    let mid_name = config.audio.mid_device.clone();
    let sink_factory: SinkFactory = Box::new(move || {
        let bass = CpalSink::new(bass_name.clone(), "bass")?;
        let mid = CpalSink::new(mid_name.clone(), "mid")?;
        Ok((
            Box::new(bass) as Box<dyn PcmSink>,
            Box::new(mid) as Box<dyn PcmSink>,
        ))
    });

    let encoder_factory: Option<EncoderFactory> = match (
        config.controls.encoder_line_a.clone(),
        config.controls.encoder_line_b.clone(),
    ) {
        (Some(a), Some(b)) => Some(Box::new(move || {
            let line_a: Box<dyn InputLine> = Box::new(SysfsInput::new(a.clone()));
            let line_b: Box<dyn InputLine> = Box::new(SysfsInput::new(b.clone()));
            EncoderDecoder::new(line_a, line_b, Instant::now())
        })),
        _ => {
            info!("Encoder lines not configured; volume knob disabled");
            None
        }
    };

    let outputs = PanelOutputs {
        relay: config
            .controls
            .relay_line
            .clone()
            .map(|p| Box::new(SysfsOutput::new(p)) as Box<dyn OutputLine>),
        party_led: config
            .controls
            .party_led_line
            .clone()
            .map(|p| Box::new(SysfsOutput::new(p)) as Box<dyn OutputLine>),
    };

    let poll_interval = Duration::from_millis(config.controls.poll_interval_ms);
    let session = Arc::new(Session::new(
        Arc::clone(&state),
        remote,
        sink_factory,
        encoder_factory,
        outputs,
        poll_interval,
    ));

    // Button poller runs for the life of the process; everything else
    // comes and goes with the session it controls
    if let Some(path) = config.controls.button_line.clone() {
        let timing = GestureTiming {
            click_timeout: Duration::from_millis(config.controls.click_timeout_ms),
            long_press: Duration::from_millis(config.controls.long_press_ms),
        };
        let decoder = ButtonDecoder::new(SysfsInput::new(path), timing, Instant::now());
        tokio::spawn(run_button_task(decoder, Arc::clone(&session), poll_interval));
    } else {
        info!("Button line not configured; playback/power gestures disabled");
    }

    // Log every broadcast event for observability
    let mut events = state.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => debug!("Event: {}", json),
                Err(_) => debug!("Event: {}", event.event_type()),
            }
        }
    });

    if args.autostart || config.controls.button_line.is_none() {
        session.start().context("Failed to start session")?;
    }

    spawn_stdin_feed(Arc::clone(&session));

    shutdown_signal().await;
    if let Err(e) = session.stop().await {
        warn!("Session teardown failed: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}

/// Feed PCM frames from stdin on a dedicated blocking thread.
///
/// Stands in for the transport's synchronous data callback: frames are
/// pushed into the session as they arrive, and the blocking sink writes
/// provide the backpressure that paces the reads.
fn spawn_stdin_feed(session: Arc<Session>) {
    let runtime = tokio::runtime::Handle::current();

    std::thread::spawn(move || {
        // The session spawns tasks when the "transport" connects
        let _guard = runtime.enter();

        if let Err(e) = session.on_connection(ConnectionState::Connecting) {
            warn!("Audio install failed: {}", e);
            return;
        }
        if let Err(e) = session.on_connection(ConnectionState::Connected) {
            warn!("Connect handling failed: {}", e);
        }

        let mut stdin = std::io::stdin();
        let mut buf = vec![0u8; MAX_FRAME_BYTES];
        // Reads are byte-oriented; carry a trailing odd byte into the
        // next frame so sample alignment survives short reads
        let mut carry: Option<u8> = None;

        loop {
            let offset = match carry.take() {
                Some(b) => {
                    buf[0] = b;
                    1
                }
                None => 0,
            };

            match stdin.read(&mut buf[offset..]) {
                Ok(0) => break,
                Ok(n) => {
                    let total = offset + n;
                    let even = total - (total % 2);
                    if total % 2 == 1 {
                        carry = Some(buf[even]);
                    }
                    if let Err(e) = session.handle_frame(&buf[..even]) {
                        warn!("Frame handling failed: {}", e);
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }

        info!("PCM input stream ended");
        if let Err(e) = session.on_connection(ConnectionState::Disconnected) {
            warn!("Disconnect handling failed: {}", e);
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
