//! Session and connection lifecycle
//!
//! Owns the pieces whose lifetime is tied to the audio session: the
//! band-splitting pipeline with its two sinks, and the encoder poller.
//! The button poller, by contrast, runs for the whole process — it is
//! what powers the session on and off.
//!
//! Lifecycle rules:
//! - Power-on drives the relay and marks the session live; power-off
//!   mutes the outputs, lets them drain, then tears everything down.
//! - The transport's `Connecting` event installs the sinks; `Connected`
//!   spawns the encoder poller; `Disconnected` mutes, uninstalls, and
//!   aborts the poller through its owned task handle so no poller can
//!   outlive the state it pokes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use biamp_common::events::SinkEvent;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::output::PcmSink;
use crate::audio::pipeline::BandSplitter;
use crate::audio::types::AudioFormat;
use crate::controls::button::Gesture;
use crate::controls::encoder::{run_encoder_task, EncoderDecoder};
use crate::controls::gpio::{InputLine, Level, OutputLine};
use crate::error::{Error, Result};
use crate::remote::{PassthroughCommand, RemoteControl};
use crate::state::SharedState;

/// Drain time between muting the outputs and tearing them down
const TEARDOWN_SETTLE: Duration = Duration::from_millis(200);

/// Transport connection state, reported by the excluded Bluetooth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Builds the pair of output sinks (bass, mid) for a session install.
pub type SinkFactory =
    Box<dyn Fn() -> Result<(Box<dyn PcmSink>, Box<dyn PcmSink>)> + Send + Sync>;

/// Builds a fresh encoder decoder when the poller is (re)spawned.
pub type EncoderFactory = Box<
    dyn Fn() -> Result<EncoderDecoder<Box<dyn InputLine>, Box<dyn InputLine>>> + Send + Sync,
>;

/// Panel output lines driven by the session.
pub struct PanelOutputs {
    /// Power relay (high while the session is on)
    pub relay: Option<Box<dyn OutputLine>>,
    /// Party-mode indicator
    pub party_led: Option<Box<dyn OutputLine>>,
}

impl PanelOutputs {
    pub fn none() -> Self {
        Self {
            relay: None,
            party_led: None,
        }
    }
}

/// Session manager: power, connection, and gesture dispatch.
pub struct Session {
    state: Arc<SharedState>,
    remote: Arc<dyn RemoteControl>,
    sink_factory: SinkFactory,
    encoder_factory: Option<EncoderFactory>,
    poll_interval: Duration,

    pipeline: Mutex<Option<BandSplitter>>,
    encoder_task: Mutex<Option<JoinHandle<()>>>,
    relay: Mutex<Option<Box<dyn OutputLine>>>,
    party_led: Mutex<Option<Box<dyn OutputLine>>>,
}

impl Session {
    pub fn new(
        state: Arc<SharedState>,
        remote: Arc<dyn RemoteControl>,
        sink_factory: SinkFactory,
        encoder_factory: Option<EncoderFactory>,
        outputs: PanelOutputs,
        poll_interval: Duration,
    ) -> Self {
        Self {
            state,
            remote,
            sink_factory,
            encoder_factory,
            poll_interval,
            pipeline: Mutex::new(None),
            encoder_task: Mutex::new(None),
            relay: Mutex::new(outputs.relay),
            party_led: Mutex::new(outputs.party_led),
        }
    }

    /// Shared state handle.
    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Power the session on. Idempotent.
    pub fn start(&self) -> Result<()> {
        if self.state.session_on() {
            return Ok(());
        }

        self.drive_relay(Level::High)?;
        self.state.set_session_on(true);
        self.state.events().emit(SinkEvent::SessionStarted {
            timestamp: chrono::Utc::now(),
        });
        info!("Session powered on");
        Ok(())
    }

    /// Power the session off: mute, drain, tear down, release the relay.
    /// Idempotent.
    pub async fn stop(&self) -> Result<()> {
        if !self.state.session_on() {
            return Ok(());
        }

        {
            let mut pipeline = self.pipeline.lock().expect("pipeline lock poisoned");
            if let Some(p) = pipeline.as_mut() {
                if let Err(e) = p.mute() {
                    warn!("Mute before teardown failed: {}", e);
                }
            }
        }
        tokio::time::sleep(TEARDOWN_SETTLE).await;

        self.teardown_audio();
        self.drive_relay(Level::Low)?;
        self.state.set_session_on(false);
        self.state.events().emit(SinkEvent::SessionStopped {
            timestamp: chrono::Utc::now(),
        });
        info!("Session powered off");
        Ok(())
    }

    /// Handle a transport connection-state change.
    pub fn on_connection(&self, conn: ConnectionState) -> Result<()> {
        info!("Transport connection state: {:?}", conn);
        match conn {
            ConnectionState::Connecting => self.install_audio(),
            ConnectionState::Connected => self.spawn_encoder(),
            ConnectionState::Disconnected => {
                {
                    let mut pipeline = self.pipeline.lock().expect("pipeline lock poisoned");
                    if let Some(p) = pipeline.as_mut() {
                        if let Err(e) = p.mute() {
                            warn!("Mute on disconnect failed: {}", e);
                        }
                    }
                }
                self.teardown_audio();
                Ok(())
            }
        }
    }

    /// Apply a newly negotiated stream format to both sinks.
    pub fn on_stream_configured(&self, format: AudioFormat) -> Result<()> {
        let mut pipeline = self.pipeline.lock().expect("pipeline lock poisoned");
        let p = pipeline
            .as_mut()
            .ok_or_else(|| Error::InvalidState("No audio session installed".to_string()))?;
        p.configure(format)?;
        drop(pipeline);

        self.state.events().emit(SinkEvent::StreamConfigured {
            sample_rate: format.sample_rate,
            channels: format.channels,
            timestamp: chrono::Utc::now(),
        });
        info!("Output sinks configured: {}", format);
        Ok(())
    }

    /// Push one frame from the transport's data callback.
    ///
    /// Frames arriving while no pipeline is installed are ignored.
    pub fn handle_frame(&self, data: &[u8]) -> Result<()> {
        let mut pipeline = self.pipeline.lock().expect("pipeline lock poisoned");
        match pipeline.as_mut() {
            Some(p) => p.push_frame_bytes(data),
            None => Ok(()),
        }
    }

    /// Store an absolute volume received from the remote controller.
    pub fn set_absolute_volume(&self, raw: u8) {
        self.state.set_volume_remote(raw);
    }

    /// Arm the one-shot volume notification; returns the current volume
    /// for the interim response.
    pub fn register_volume_notification(&self) -> u8 {
        self.state.arm_volume_notification()
    }

    /// Dispatch a classified button gesture.
    pub async fn handle_gesture(&self, gesture: Gesture) -> Result<()> {
        match gesture {
            Gesture::LongPress => {
                if self.state.session_on() {
                    self.stop().await
                } else {
                    self.start()
                }
            }
            Gesture::Clicks(count) => self.dispatch_clicks(count),
        }
    }

    /// Whether a pipeline is currently installed.
    pub fn audio_installed(&self) -> bool {
        self.pipeline.lock().expect("pipeline lock poisoned").is_some()
    }

    /// Whether the encoder poller is currently running.
    pub fn encoder_running(&self) -> bool {
        self.encoder_task
            .lock()
            .expect("encoder task lock poisoned")
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn dispatch_clicks(&self, count: u8) -> Result<()> {
        if !self.state.session_on() {
            debug!("Ignoring {}-click burst: session is off", count);
            return Ok(());
        }

        match count {
            1 => {
                // Flip the cached state optimistically so the next press
                // sends the opposite command even before the remote
                // echoes a status change
                let playing = self.state.is_playing();
                let command = if playing {
                    PassthroughCommand::Pause
                } else {
                    PassthroughCommand::Play
                };
                self.remote.send_command(command)?;
                self.state.set_playing(!playing);
            }
            2 => self.remote.send_command(PassthroughCommand::Next)?,
            3 => self.remote.send_command(PassthroughCommand::Previous)?,
            4 => {
                let enabled = self.state.toggle_party_mode();
                let mut led = self.party_led.lock().expect("party led lock poisoned");
                if let Some(line) = led.as_mut() {
                    line.set(if enabled { Level::High } else { Level::Low })?;
                }
                info!("Party mode {}", if enabled { "enabled" } else { "disabled" });
            }
            n => debug!("Discarding {}-click burst", n),
        }
        Ok(())
    }

    fn install_audio(&self) -> Result<()> {
        let (bass, mid) = (self.sink_factory)()?;
        let mut splitter = BandSplitter::new(Arc::clone(&self.state), bass, mid);
        splitter.configure(AudioFormat::default())?;

        let mut pipeline = self.pipeline.lock().expect("pipeline lock poisoned");
        if pipeline.is_some() {
            warn!("Replacing an already-installed audio pipeline");
        }
        *pipeline = Some(splitter);
        info!("Audio pipeline installed");
        Ok(())
    }

    fn spawn_encoder(&self) -> Result<()> {
        let Some(factory) = self.encoder_factory.as_ref() else {
            debug!("No encoder configured; poller not started");
            return Ok(());
        };

        let mut task = self.encoder_task.lock().expect("encoder task lock poisoned");
        if task.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return Ok(());
        }

        let decoder = factory()?;
        let handle = tokio::spawn(run_encoder_task(
            decoder,
            Arc::clone(&self.state),
            Arc::clone(&self.remote),
            self.poll_interval,
        ));
        *task = Some(handle);
        info!("Encoder poller started");
        Ok(())
    }

    /// Drop the pipeline and abort the encoder poller.
    ///
    /// The abort is what guarantees no poller keeps referencing session
    /// state after a disconnect.
    fn teardown_audio(&self) {
        let dropped = self
            .pipeline
            .lock()
            .expect("pipeline lock poisoned")
            .take()
            .is_some();
        if dropped {
            info!("Audio pipeline uninstalled");
        }

        if let Some(handle) = self
            .encoder_task
            .lock()
            .expect("encoder task lock poisoned")
            .take()
        {
            handle.abort();
            info!("Encoder poller stopped");
        }
    }

    fn drive_relay(&self, level: Level) -> Result<()> {
        let mut relay = self.relay.lock().expect("relay lock poisoned");
        if let Some(line) = relay.as_mut() {
            line.set(level)?;
        }
        Ok(())
    }
}
