//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use spanio::streaming::ItemProducer;

/// Deterministic, non-repeating-looking payload of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + i / 251) as u8).collect()
}

/// Path of volume `number` for `base` (`base.001`, `base.002`, ...).
pub fn volume_path(base: &Path, number: u32) -> PathBuf {
    let mut path = base.as_os_str().to_os_string();
    path.push(format!(".{:03}", number));
    PathBuf::from(path)
}

/// Sizes of the volume files that exist for `base`, in order.
pub fn volume_sizes_on_disk(base: &Path) -> Vec<u64> {
    (1..)
        .map(|n| volume_path(base, n))
        .map_while(|path| std::fs::metadata(path).ok())
        .map(|meta| meta.len())
        .collect()
}

/// Concatenation of every volume file for `base`.
pub fn concat_volumes(base: &Path) -> Vec<u8> {
    let mut data = Vec::new();
    for n in 1.. {
        match std::fs::read(volume_path(base, n)) {
            Ok(bytes) => data.extend_from_slice(&bytes),
            Err(_) => break,
        }
    }
    data
}

/// Writes `data` as hand-made volumes with the given sizes.
pub fn write_volumes(base: &Path, data: &[u8], sizes: &[usize]) {
    assert_eq!(sizes.iter().sum::<usize>(), data.len());
    let mut offset = 0;
    for (i, &size) in sizes.iter().enumerate() {
        std::fs::write(volume_path(base, i as u32 + 1), &data[offset..offset + size]).unwrap();
        offset += size;
    }
}

/// An in-memory item source: `Some(contents)` for files, `None` for directories.
pub struct MemoryItems {
    pub items: Vec<Option<Vec<u8>>>,
    /// Item index at which `produce` fails after writing half of it.
    pub fail_at: Option<usize>,
}

impl MemoryItems {
    pub fn new(items: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            items,
            fail_at: None,
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl ItemProducer for MemoryItems {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn is_directory(&self, index: usize) -> bool {
        self.items[index].is_none()
    }

    fn produce(&mut self, index: usize, out: &mut dyn Write) -> spanio::Result<()> {
        let Some(data) = &self.items[index] else {
            return Ok(());
        };
        if self.fail_at == Some(index) {
            out.write_all(&data[..data.len() / 2])?;
            return Err(spanio::Error::ProducerFailed(format!(
                "data error in item {}",
                index
            )));
        }
        out.write_all(data)?;
        Ok(())
    }
}
