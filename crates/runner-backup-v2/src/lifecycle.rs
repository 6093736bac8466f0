use tracing::{error, info, warn};

use crate::errors::{BackupError, LifecycleAction};

pub type SupervisorError = Box<dyn std::error::Error + Send + Sync>;

/// The process supervisor that owns the managed server.
pub trait ServerSupervisor: Send + Sync {
    fn is_running(&self, server_id: &str) -> Result<bool, SupervisorError>;
    fn stop(&self, server_id: &str) -> Result<(), SupervisorError>;
    fn start(&self, server_id: &str) -> Result<(), SupervisorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    #[default]
    Always,
    OnSuccess,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardOptions {
    pub stop_before: bool,
    pub restart: RestartPolicy,
}

impl GuardOptions {
    pub fn stop_then(restart: RestartPolicy) -> Self {
        Self {
            stop_before: true,
            restart,
        }
    }
}

/// Run `op` with the server stopped if requested, restarting it afterwards.
///
/// Without `stop_before` the supervisor is never consulted. Only a server this
/// guard stopped is restarted. A failing stop aborts before `op` runs. An error
/// from `op` is returned as-is even if the restart also fails; a restart failure
/// after a successful `op` becomes [`BackupError::Restart`].
pub fn run_guarded<T, F>(
    supervisor: &dyn ServerSupervisor,
    server_id: &str,
    options: GuardOptions,
    op: F,
) -> Result<T, BackupError>
where
    F: FnOnce() -> Result<T, BackupError>,
{
    if !options.stop_before {
        return op();
    }

    let stopped = supervisor
        .is_running(server_id)
        .map_err(|err| supervisor_error(LifecycleAction::Query, server_id, err))?;
    if stopped {
        info!(server = server_id, "stopping server for backup operation");
        supervisor
            .stop(server_id)
            .map_err(|err| supervisor_error(LifecycleAction::Stop, server_id, err))?;
    }

    let mut unwind = RestartOnUnwind {
        supervisor,
        server_id,
        armed: stopped && options.restart == RestartPolicy::Always,
    };
    let result = op();
    unwind.armed = false;

    let restart = stopped
        && match options.restart {
            RestartPolicy::Always => true,
            RestartPolicy::OnSuccess => result.is_ok(),
            RestartPolicy::Never => false,
        };
    if !restart {
        if stopped {
            info!(server = server_id, "leaving server stopped");
        }
        return result;
    }

    info!(server = server_id, "restarting server");
    match (result, supervisor.start(server_id)) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(BackupError::Restart {
            server_id: server_id.to_string(),
            message: err.to_string(),
        }),
        (Err(op_err), Ok(())) => Err(op_err),
        (Err(op_err), Err(err)) => {
            error!(server = server_id, "restart after failed operation also failed: {err}");
            Err(op_err)
        }
    }
}

fn supervisor_error(action: LifecycleAction, server_id: &str, err: SupervisorError) -> BackupError {
    BackupError::Supervisor {
        action,
        server_id: server_id.to_string(),
        message: err.to_string(),
    }
}

// Panics count as failures: only the unconditional policy restarts on the way out.
struct RestartOnUnwind<'a> {
    supervisor: &'a dyn ServerSupervisor,
    server_id: &'a str,
    armed: bool,
}

impl Drop for RestartOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed && std::thread::panicking() {
            warn!(server = self.server_id, "operation panicked; restarting server");
            if let Err(err) = self.supervisor.start(self.server_id) {
                error!(server = self.server_id, "restart during unwind failed: {err}");
            }
        }
    }
}
