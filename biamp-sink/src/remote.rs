//! Remote-control collaborator boundary
//!
//! The AVRCP layer lives outside this crate; the sink reaches it through
//! [`RemoteControl`]. Playback commands go out as press/release
//! passthrough pairs, and the volume-changed notification fires only when
//! the remote previously armed it (see `SharedState`).

use tracing::info;

use crate::Result;

/// Discrete passthrough commands toward the remote player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughCommand {
    Play,
    Pause,
    Next,
    Previous,
}

impl std::fmt::Display for PassthroughCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PassthroughCommand::Play => "play",
            PassthroughCommand::Pause => "pause",
            PassthroughCommand::Next => "next",
            PassthroughCommand::Previous => "previous",
        };
        write!(f, "{}", name)
    }
}

/// Key state of a passthrough transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Interface to the remote-control transport.
pub trait RemoteControl: Send + Sync {
    /// Transmit one passthrough key event.
    fn passthrough(&self, command: PassthroughCommand, state: KeyState) -> Result<()>;

    /// Deliver the armed volume-changed notification.
    fn notify_volume_changed(&self, volume: u8) -> Result<()>;

    /// Issue a command as the full press/release pair.
    fn send_command(&self, command: PassthroughCommand) -> Result<()> {
        self.passthrough(command, KeyState::Pressed)?;
        self.passthrough(command, KeyState::Released)
    }
}

/// Remote that only logs, for running without a transport attached.
pub struct LogRemote;

impl RemoteControl for LogRemote {
    fn passthrough(&self, command: PassthroughCommand, state: KeyState) -> Result<()> {
        info!("Passthrough {}: {:?}", command, state);
        Ok(())
    }

    fn notify_volume_changed(&self, volume: u8) -> Result<()> {
        info!("Volume change notification: {}", volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingRemote {
        events: Mutex<Vec<(PassthroughCommand, KeyState)>>,
    }

    impl RemoteControl for RecordingRemote {
        fn passthrough(&self, command: PassthroughCommand, state: KeyState) -> Result<()> {
            self.events.lock().unwrap().push((command, state));
            Ok(())
        }

        fn notify_volume_changed(&self, _volume: u8) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_command_is_a_press_release_pair() {
        let remote = RecordingRemote {
            events: Mutex::new(Vec::new()),
        };
        remote.send_command(PassthroughCommand::Next).unwrap();

        let events = remote.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                (PassthroughCommand::Next, KeyState::Pressed),
                (PassthroughCommand::Next, KeyState::Released),
            ]
        );
    }
}
