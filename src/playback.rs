//! Reply synthesis and fire-and-forget playback.
//!
//! Each scheduled reply is synthesized, written to a per-session temp
//! directory, and handed to the platform audio player without waiting for
//! playback to finish. A per-reply cleanup task deletes the audio file
//! after a fixed delay; shutdown cancels every pending delay, kills any
//! still-running player, and deletes everything immediately. No reply
//! audio survives the session.

use crate::config::PlaybackConfig;
use crate::error::Result;
use crate::tts::TextToSpeech;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Synthesizes and plays replies, owning their temp files until cleanup.
pub struct PlaybackScheduler {
    tts: TextToSpeech,
    work_dir: tempfile::TempDir,
    cleanup_delay: Duration,
    player_command: Option<String>,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl PlaybackScheduler {
    /// # Errors
    ///
    /// Returns an error if the temp directory cannot be created.
    pub fn new(tts: TextToSpeech, config: &PlaybackConfig) -> Result<Self> {
        Ok(Self {
            tts,
            work_dir: tempfile::tempdir()?,
            cleanup_delay: Duration::from_secs(config.cleanup_delay_secs),
            player_command: config.player_command.clone(),
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        })
    }

    /// Directory holding not-yet-cleaned reply audio.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Synthesize `text` and start playing it. Does not wait for playback.
    ///
    /// Synthesis failure downgrades the turn to text-only: it is logged
    /// and the turn carries on with no audio.
    pub async fn schedule(&mut self, text: &str) {
        let audio = match self.tts.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, reply is text-only");
                return;
            }
        };

        let path = self
            .work_dir
            .path()
            .join(format!("reply-{}.mp3", uuid::Uuid::new_v4()));
        if let Err(e) = std::fs::write(&path, &audio) {
            tracing::warn!(error = %e, "failed to write reply audio");
            return;
        }

        let token = self.cancel.child_token();
        let delay = self.cleanup_delay;
        let command = player_invocation(self.player_command.as_deref(), &path);
        self.tasks.spawn(async move {
            play_and_clean(command, path, delay, token).await;
        });
    }

    /// Cancel all pending cleanups and delete their files now.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        while self.tasks.join_next().await.is_some() {}
        // TempDir drop removes the directory itself.
    }
}

/// Platform player invocation for an MP3 file.
fn player_invocation(override_command: Option<&str>, path: &Path) -> (String, Vec<String>) {
    if let Some(command) = override_command {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "mpg123".to_string());
        let mut args: Vec<String> = parts.collect();
        args.push(path.display().to_string());
        return (program, args);
    }
    let file = path.display().to_string();
    if cfg!(target_os = "macos") {
        ("afplay".to_string(), vec![file])
    } else if cfg!(target_os = "windows") {
        ("cmd".to_string(), vec!["/C".to_string(), "start".to_string(), file])
    } else {
        ("mpg123".to_string(), vec!["-q".to_string(), file])
    }
}

async fn play_and_clean(
    (program, args): (String, Vec<String>),
    path: PathBuf,
    delay: Duration,
    token: CancellationToken,
) {
    let child = tokio::process::Command::new(&program)
        .args(&args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn();
    let mut child = match child {
        Ok(child) => Some(child),
        Err(e) => {
            tracing::warn!(player = %program, error = %e, "failed to start audio player");
            None
        }
    };

    tokio::select! {
        () = token.cancelled() => {
            if let Some(child) = child.as_mut() {
                let _ = child.kill().await;
            }
        }
        () = tokio::time::sleep(delay) => {}
    }

    match std::fs::remove_file(&path) {
        Ok(()) => tracing::debug!(file = %path.display(), "reply audio removed"),
        Err(e) => tracing::warn!(file = %path.display(), error = %e, "failed to remove reply audio"),
    }
}
