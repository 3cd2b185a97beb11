//! Configuration for split-volume streams.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Name prefix and segment size of a split stream.
///
/// A [`MultiVolumeWriter`](super::MultiVolumeWriter) cuts its output into
/// `prefix.001`, `prefix.002`, ... of `volume_size` bytes each; only the
/// last volume may be shorter.
///
/// ```rust
/// use spanio::volume::VolumeConfig;
///
/// let config = VolumeConfig::new("backup.tar", 4096);
/// assert_eq!(config.volume_path(1).to_str().unwrap(), "backup.tar.001");
/// assert_eq!(config.volume_path(12).to_str().unwrap(), "backup.tar.012");
/// ```
#[derive(Debug, Clone)]
pub struct VolumeConfig {
    /// Size of each volume in bytes (except possibly the last).
    pub volume_size: u64,
    /// Name prefix for volume files (without the volume number).
    base_path: PathBuf,
}

impl VolumeConfig {
    /// Creates a configuration for `volume_size`-byte segments named after
    /// `base_path`.
    pub fn new(base_path: impl AsRef<Path>, volume_size: u64) -> Self {
        Self {
            volume_size,
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Returns the name prefix of the volumes.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Generates the path for a specific volume number.
    ///
    /// Volume numbers are 1-indexed and padded to at least 3 digits; past
    /// 999 the field simply widens.
    ///
    /// ```rust
    /// use spanio::volume::VolumeConfig;
    ///
    /// let config = VolumeConfig::new("data.bin", 1024 * 1024);
    /// assert_eq!(config.volume_path(10).to_str().unwrap(), "data.bin.010");
    /// assert_eq!(config.volume_path(1000).to_str().unwrap(), "data.bin.1000");
    /// ```
    pub fn volume_path(&self, volume_number: u32) -> PathBuf {
        volume_path_for(&self.base_path, volume_number)
    }

    /// Returns the volume size in bytes.
    pub fn volume_size(&self) -> u64 {
        self.volume_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.volume_size == 0 {
            return Err(Error::InvalidConfig(
                "volume_size must be greater than 0".into(),
            ));
        }
        if self.base_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("base_path must not be empty".into()));
        }
        Ok(())
    }
}

/// Formats `prefix.NNN` for a 1-indexed volume number.
pub(crate) fn volume_path_for(base: &Path, volume_number: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{:03}", volume_number));
    PathBuf::from(name)
}
