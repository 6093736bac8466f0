//! Fixtures shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use filetime::FileTime;

use crate::instance::ServerInstance;
use crate::lifecycle::{ServerSupervisor, SupervisorError};

pub(crate) fn touch(dir: &Path, name: &str) -> PathBuf {
    write(dir, name, name.as_bytes())
}

pub(crate) fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).expect("create fixture dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// Pin a file's modification time to `seconds_ago` before now.
pub(crate) fn set_age(path: &Path, seconds_ago: i64) {
    let now = SystemTime::now();
    let at = if seconds_ago >= 0 {
        now - Duration::from_secs(seconds_ago as u64)
    } else {
        now + Duration::from_secs(seconds_ago.unsigned_abs())
    };
    filetime::set_file_mtime(path, FileTime::from_system_time(at)).expect("set mtime");
}

/// A server install with a world and all three tracked config files.
pub(crate) fn seed_server(root: &Path, server_id: &str) -> ServerInstance {
    let install = root.join("servers").join(server_id);
    write(
        &install,
        "server.properties",
        b"server-name=Alpha\nlevel-name=Alpha World\nmax-players=10\n",
    );
    write(&install, "allowlist.json", br#"[{"name":"steve"}]"#);
    write(&install, "permissions.json", br#"[{"permission":"operator"}]"#);
    let world = install.join("worlds").join("Alpha World");
    write(&world, "level.dat", b"level-data");
    write(&world.join("db"), "000001.ldb", b"chunk-data");
    ServerInstance::new(server_id, install)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    IsRunning,
    Stop,
    Start,
}

/// Records every supervisor call; `stop`/`start` flip the running flag.
#[derive(Default)]
pub(crate) struct FakeSupervisor {
    pub running: Mutex<bool>,
    pub calls: Mutex<Vec<Call>>,
    pub fail_query: bool,
    pub fail_stop: bool,
    pub fail_start: bool,
}

impl FakeSupervisor {
    pub fn running() -> Self {
        Self {
            running: Mutex::new(true),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn is_up(&self) -> bool {
        *self.running.lock().expect("running lock")
    }
}

impl ServerSupervisor for FakeSupervisor {
    fn is_running(&self, _server_id: &str) -> Result<bool, SupervisorError> {
        self.calls.lock().expect("calls lock").push(Call::IsRunning);
        if self.fail_query {
            return Err("unknown server".into());
        }
        Ok(self.is_up())
    }

    fn stop(&self, _server_id: &str) -> Result<(), SupervisorError> {
        self.calls.lock().expect("calls lock").push(Call::Stop);
        if self.fail_stop {
            return Err("stop timed out".into());
        }
        *self.running.lock().expect("running lock") = false;
        Ok(())
    }

    fn start(&self, _server_id: &str) -> Result<(), SupervisorError> {
        self.calls.lock().expect("calls lock").push(Call::Start);
        if self.fail_start {
            return Err("start failed".into());
        }
        *self.running.lock().expect("running lock") = true;
        Ok(())
    }
}
