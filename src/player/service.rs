//! Task that owns the orchestrator and serializes every mutation.
//!
//! UI intents arrive as [`PlayerCommand`]s, engine and surface callbacks as
//! [`PlayerEvent`]s; both are handled one at a time on the same task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::Track;
use super::events::EventReceiver;
use super::orchestrator::{DisplaySink, PlaybackOrchestrator};

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    Select(Track),
    TogglePlayback,
    ToggleMode,
    SetVolume(u8),
    SeekBy(f64),
    Shutdown,
}

/// Cloneable sender side of the player task
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Player task is gone, command dropped");
        }
    }

    pub fn select(&self, track: Track) {
        self.send(PlayerCommand::Select(track));
    }

    pub fn toggle_playback(&self) {
        self.send(PlayerCommand::TogglePlayback);
    }

    pub fn toggle_mode(&self) {
        self.send(PlayerCommand::ToggleMode);
    }

    pub fn set_volume(&self, level: u8) {
        self.send(PlayerCommand::SetVolume(level));
    }

    pub fn seek_by(&self, delta_seconds: f64) {
        self.send(PlayerCommand::SeekBy(delta_seconds));
    }

    pub fn shutdown(&self) {
        self.send(PlayerCommand::Shutdown);
    }
}

pub fn spawn_player<D>(
    mut orchestrator: PlaybackOrchestrator<D>,
    mut events: EventReceiver,
) -> (PlayerHandle, JoinHandle<()>)
where
    D: DisplaySink + 'static,
{
    let (tx, mut commands) = mpsc::unbounded_channel();
    tracing::info!("Starting player task");

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    tracing::trace!(?command, "Player command");
                    match command {
                        PlayerCommand::Select(track) => orchestrator.select_track(track),
                        PlayerCommand::TogglePlayback => orchestrator.toggle_playback(),
                        PlayerCommand::ToggleMode => orchestrator.toggle_mode(),
                        PlayerCommand::SetVolume(level) => orchestrator.set_volume(level),
                        PlayerCommand::SeekBy(delta) => orchestrator.seek_by(delta),
                        PlayerCommand::Shutdown => break,
                    }
                }
                Some(event) = events.recv() => {
                    orchestrator.handle_event(event);
                }
            }
        }
        orchestrator.shutdown();
        tracing::debug!("Player task shutting down");
    });

    (PlayerHandle { tx }, task)
}
