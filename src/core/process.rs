//! Self-update/restart control for the admin surface.
//!
//! `/update` pulls the latest code and exits the process; the supervisor
//! (systemd / docker restart policy) brings the new binary up. Queue purging
//! lives on the broker, not here; this module only touches process state.

use crate::core::error::AppError;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Pulls the latest code in the working directory.
///
/// Failures are reported but tolerated; an unreachable remote must not take
/// the running bot down with it.
pub async fn pull_latest() -> Result<String, AppError> {
    log::info!("Self-update: running git pull...");

    let result = timeout(GIT_TIMEOUT, TokioCommand::new("git").arg("pull").output()).await;

    match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if output.status.success() {
                log::info!("Self-update: git pull completed: {}", stdout);
                Ok(stdout)
            } else {
                log::warn!("Self-update: git pull failed (exit {:?}): {}", output.status.code(), stderr);
                Err(AppError::Download(format!("git pull failed: {}", stderr)))
            }
        }
        Ok(Err(e)) => {
            log::warn!("Self-update: failed to execute git: {}", e);
            Err(AppError::Io(e))
        }
        Err(_) => {
            log::warn!("Self-update: git pull timed out");
            Err(AppError::RegistryTimeout)
        }
    }
}

/// Schedules a process exit shortly after the caller has had a chance to
/// acknowledge the admin command. The supervisor restarts the binary.
pub fn schedule_restart() {
    log::info!("Restart requested; exiting in 2s so the supervisor relaunches the updated binary");
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        #[allow(clippy::exit)]
        std::process::exit(0);
    });
}
