//! CPU hotplug through sysfs.
//!
//! Each unit `N` maps to `<root>/cpuN/online`. Writing `1` brings the CPU
//! up and `0` takes it down. A CPU directory without an `online` file is
//! not hot-pluggable and is always counted as online.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use coreplug_controller::{CoreControl, UnitError};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Unit control backed by `/sys/devices/system/cpu`.
#[derive(Debug, Clone)]
pub struct SysfsCores {
    root: PathBuf,
    units: u32,
}

impl SysfsCores {
    pub fn new(root: impl Into<PathBuf>, units: u32) -> Self {
        Self {
            root: root.into(),
            units,
        }
    }

    /// Count the `cpuN` directories present under `root`.
    pub fn present_units(root: &Path) -> std::io::Result<u32> {
        let mut count = 0;
        for entry in std::fs::read_dir(root)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(index) = name.strip_prefix("cpu")
                && !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit())
            {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    fn online_path(&self, index: u32) -> PathBuf {
        self.root.join(format!("cpu{index}")).join("online")
    }

    fn write(&self, index: u32, online: bool) -> Result<(), UnitError> {
        if index >= self.units {
            return Err(UnitError::NoSuchUnit(index));
        }
        let path = self.online_path(index);
        std::fs::write(&path, if online { "1" } else { "0" })
            .map_err(|source| UnitError::Io { index, source })?;
        debug!(unit = index, online, "unit state written");
        Ok(())
    }
}

impl CoreControl for SysfsCores {
    fn online_count(&self) -> u32 {
        (0..self.units).filter(|&i| self.is_online(i)).count() as u32
    }

    fn is_online(&self, index: u32) -> bool {
        if index >= self.units {
            return false;
        }
        let path = self.online_path(index);
        match std::fs::read_to_string(&path) {
            Ok(content) => content.trim() == "1",
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.root.join(format!("cpu{index}")).is_dir()
            }
            Err(e) => {
                warn!(unit = index, path = %path.display(), error = %e, "failed to read unit state");
                false
            }
        }
    }

    fn activate(&self, index: u32) -> Result<(), UnitError> {
        self.write(index, true)
    }

    fn deactivate(&self, index: u32) -> Result<(), UnitError> {
        if index == 0 {
            return Err(UnitError::Pinned(0));
        }
        self.write(index, false)
    }
}
