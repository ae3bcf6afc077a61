use parking_lot::Mutex;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::config::WatcherConfig;

/// Owns the external file-watcher process that keeps the catalog in sync
/// with files dropped into the upload tree by hand.
///
/// The child is killed on [`WatcherProcess::stop`] or, failing that, when
/// the manager is dropped.
pub struct WatcherProcess {
    config: WatcherConfig,
    child: Mutex<Option<Child>>,
}

impl WatcherProcess {
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    /// Spawns the watcher unless it is already running. A failure to spawn
    /// is logged and reported as `false`; the server keeps running without it.
    pub fn start(&self) -> bool {
        let mut child = self.child.lock();
        if child.is_some() {
            return true;
        }

        let spawned = Command::new(&self.config.command)
            .arg(&self.config.script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(mut process) => {
                if let Some(stdout) = process.stdout.take() {
                    forward_output(stdout, false);
                }
                if let Some(stderr) = process.stderr.take() {
                    forward_output(stderr, true);
                }
                log::info!(
                    "File watcher started: {} {}",
                    self.config.command,
                    self.config.script.display()
                );
                *child = Some(process);
                true
            }
            Err(e) => {
                log::error!("Failed to start file watcher: {}", e);
                false
            }
        }
    }

    /// Terminates the watcher and waits for it to exit.
    pub async fn stop(&self) {
        let child = self.child.lock().take();
        let Some(mut process) = child else {
            return;
        };
        if let Err(e) = process.kill().await {
            log::warn!("Failed to stop file watcher: {}", e);
            return;
        }
        log::info!("File watcher stopped");
    }

    pub fn is_running(&self) -> bool {
        let mut child = self.child.lock();
        let status = child.as_mut().map(Child::try_wait);
        match status {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                log::warn!("File watcher exited with {}", status);
                *child = None;
                false
            }
            Some(Err(_)) | None => false,
        }
    }
}

impl Drop for WatcherProcess {
    fn drop(&mut self) {
        if let Some(process) = self.child.get_mut().as_mut() {
            let _ = process.start_kill();
        }
    }
}

fn forward_output<R>(stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                log::warn!(target: "watcher", "{}", line);
            } else {
                log::info!(target: "watcher", "{}", line);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_command_is_not_fatal() {
        let watcher = WatcherProcess::new(WatcherConfig {
            enabled: true,
            command: "definitely-not-a-real-watcher-binary".to_string(),
            script: PathBuf::from("watch.js"),
        });
        assert!(!watcher.start());
        assert!(!watcher.is_running());
        watcher.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_and_stop() {
        let watcher = WatcherProcess::new(WatcherConfig {
            enabled: true,
            command: "sleep".to_string(),
            script: PathBuf::from("30"),
        });
        assert!(watcher.start());
        assert!(watcher.is_running());
        // Second start is a no-op
        assert!(watcher.start());

        watcher.stop().await;
        assert!(!watcher.is_running());
    }
}
