//! Configuration for streaming sessions.
//!
//! This module provides [`QueueConfig`] for controlling how much memory a
//! [`BufferQueue`](super::BufferQueue) may hold and how producer writes are
//! chunked before they are queued.

/// Smallest memory bound picked by [`QueueConfig::auto_sized`] (4 MiB).
pub const MIN_MAX_MEMORY_USAGE: u64 = 4 * 1024 * 1024;

/// Configuration for a bounded streaming session.
///
/// # Example
///
/// ```rust
/// use spanio::streaming::QueueConfig;
///
/// // Default configuration (64 MiB bound, 1 MiB chunks)
/// let config = QueueConfig::default();
///
/// // Custom configuration for constrained environments
/// let config = QueueConfig::new()
///     .max_memory_usage(8 * 1024 * 1024)  // 8 MiB
///     .chunk_size(64 * 1024);              // 64 KiB
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Upper bound on bytes held by the queue.
    ///
    /// Default: 64 MiB.
    pub max_memory_usage: u64,

    /// Largest buffer a producer write is split into.
    ///
    /// Must be strictly smaller than `max_memory_usage`.
    /// Default: 1 MiB.
    pub chunk_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_memory_usage: 64 * 1024 * 1024, // 64 MiB
            chunk_size: 1024 * 1024,            // 1 MiB
        }
    }
}

impl QueueConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for memory-constrained environments.
    pub fn low_memory() -> Self {
        Self {
            max_memory_usage: MIN_MAX_MEMORY_USAGE,
            chunk_size: 256 * 1024, // 256 KiB
        }
    }

    /// Creates a configuration sized for the current system.
    ///
    /// The bound is a quarter of the available RAM, never less than
    /// [`MIN_MAX_MEMORY_USAGE`].
    ///
    /// Requires the `sysinfo` feature. Without it, falls back to the
    /// default configuration.
    #[cfg(feature = "sysinfo")]
    pub fn auto_sized() -> Self {
        match Self::available_memory() {
            Some(available) => Self::for_available_memory(available),
            None => Self::default(),
        }
    }

    /// Creates a configuration sized for the current system.
    ///
    /// This is a fallback when the `sysinfo` feature is not enabled.
    /// Returns the default configuration.
    #[cfg(not(feature = "sysinfo"))]
    pub fn auto_sized() -> Self {
        Self::default()
    }

    /// Creates a configuration for a system with `available` bytes of free RAM.
    pub fn for_available_memory(available: u64) -> Self {
        let max_memory_usage = (available / 4).max(MIN_MAX_MEMORY_USAGE);
        let defaults = Self::default();
        // Keep chunks at no more than 1/16 of the bound.
        let chunk_size = (max_memory_usage / 16).min(defaults.chunk_size as u64) as usize;
        Self {
            max_memory_usage,
            chunk_size,
        }
    }

    /// Returns the available system memory in bytes.
    ///
    /// Returns `None` when the `sysinfo` feature is not enabled or the
    /// platform reports nothing.
    #[cfg(feature = "sysinfo")]
    pub fn available_memory() -> Option<u64> {
        use sysinfo::System;

        let mut sys = System::new();
        sys.refresh_memory();
        let available = sys.available_memory();
        (available > 0).then_some(available)
    }

    /// Returns the available system memory in bytes.
    ///
    /// Returns `None` when the `sysinfo` feature is not enabled.
    #[cfg(not(feature = "sysinfo"))]
    pub fn available_memory() -> Option<u64> {
        None
    }

    /// Sets the memory bound.
    pub fn max_memory_usage(mut self, bytes: u64) -> Self {
        self.max_memory_usage = bytes;
        self
    }

    /// Sets the chunk size.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error if any values are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.chunk_size == 0 {
            return Err(crate::Error::InvalidConfig(
                "chunk_size must be greater than 0".into(),
            ));
        }

        if self.chunk_size as u64 >= self.max_memory_usage {
            return Err(crate::Error::InvalidConfig(format!(
                "chunk_size ({}) must be smaller than max_memory_usage ({})",
                self.chunk_size, self.max_memory_usage
            )));
        }

        Ok(())
    }
}
