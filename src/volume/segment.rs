//! Single-volume wrappers with offset bookkeeping.
//!
//! [`VolumeWriter`] is one output segment: it tracks its write cursor and
//! the highest offset ever written (its realized size). [`VolumeSource`] is
//! one input segment: it knows where it starts in the logical stream and
//! how many bytes it holds.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A writable volume file.
#[derive(Debug)]
pub struct VolumeWriter {
    path: PathBuf,
    /// Volume number (1-indexed).
    number: u32,
    file: BufWriter<File>,
    /// Cursor within this volume.
    offset: u64,
    /// High-water mark of this volume.
    current_size: u64,
}

impl VolumeWriter {
    /// Creates (or truncates) the volume file at `path`.
    pub fn create(path: impl AsRef<Path>, number: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| Error::VolumeCreate {
                volume: number,
                path: path.display().to_string(),
                source,
            })?;
        log::debug!("Created volume {} at '{}'", number, path.display());

        Ok(Self {
            path,
            number,
            file: BufWriter::new(file),
            offset: 0,
            current_size: 0,
        })
    }

    /// Returns the path of the volume file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the volume number (1-indexed).
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the write cursor within this volume.
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Returns the realized size of this volume.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Writes at the cursor, advancing it and the high-water mark.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        if n == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("volume {} accepted no bytes", self.number),
            ));
        }
        self.offset += n as u64;
        self.current_size = self.current_size.max(self.offset);
        Ok(n)
    }

    /// Moves the cursor without changing the realized size.
    pub fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Truncates or extends the file and sets the realized size to `size`.
    pub fn set_size(&mut self, size: u64) -> io::Result<()> {
        self.file.flush()?;
        self.file.get_ref().set_len(size)?;
        self.current_size = size;
        Ok(())
    }

    /// Flushes buffered bytes to the file.
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// A readable volume file positioned inside the logical stream.
#[derive(Debug)]
pub struct VolumeSource {
    path: PathBuf,
    number: u32,
    reader: BufReader<File>,
    /// Position of this volume's first byte in the logical stream.
    global_offset: u64,
    size: u64,
    /// Cursor within this volume.
    position: u64,
}

impl VolumeSource {
    /// Opens the volume file at `path`, which starts at `global_offset`.
    pub fn open(path: impl AsRef<Path>, number: u32, global_offset: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let missing = |source: io::Error| Error::VolumeMissing {
            volume: number,
            path: path.display().to_string(),
            source,
        };
        let file = File::open(&path).map_err(missing)?;
        let size = file.metadata().map_err(missing)?.len();

        Ok(Self {
            path,
            number,
            reader: BufReader::new(file),
            global_offset,
            size,
            position: 0,
        })
    }

    /// Returns the path of the volume file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the volume number (1-indexed).
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the position of this volume's first byte in the logical stream.
    pub fn global_offset(&self) -> u64 {
        self.global_offset
    }

    /// Returns the size of this volume in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the logical position falls inside this volume.
    pub fn contains(&self, position: u64) -> bool {
        position >= self.global_offset && position - self.global_offset < self.size
    }

    /// Reads from `local_offset`, never past the end of this volume.
    pub fn read_at(&mut self, local_offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if local_offset >= self.size {
            return Ok(0);
        }
        if local_offset != self.position {
            self.reader.seek(SeekFrom::Start(local_offset))?;
            self.position = local_offset;
        }

        let remaining = self.size - local_offset;
        let len = (buf.len() as u64).min(remaining) as usize;
        let n = self.reader.read(&mut buf[..len])?;
        self.position += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writer_tracks_offset_and_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.001");
        let mut volume = VolumeWriter::create(&path, 1).unwrap();

        assert_eq!(volume.write(&[1u8; 10]).unwrap(), 10);
        assert_eq!(volume.current_offset(), 10);
        assert_eq!(volume.current_size(), 10);

        volume.seek(4).unwrap();
        assert_eq!(volume.current_offset(), 4);
        assert_eq!(volume.current_size(), 10);

        volume.write(&[2u8; 3]).unwrap();
        assert_eq!(volume.current_offset(), 7);
        assert_eq!(volume.current_size(), 10);

        volume.flush().unwrap();
        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..4], &[1u8; 4]);
        assert_eq!(&data[4..7], &[2u8; 3]);
        assert_eq!(&data[7..], &[1u8; 3]);
    }

    #[test]
    fn test_writer_set_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.001");
        let mut volume = VolumeWriter::create(&path, 1).unwrap();

        volume.write(&[7u8; 20]).unwrap();
        volume.set_size(5).unwrap();
        assert_eq!(volume.current_size(), 5);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 5);
    }

    #[test]
    fn test_writer_create_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("v.001");
        let err = VolumeWriter::create(&path, 1).unwrap_err();
        assert!(matches!(err, Error::VolumeCreate { volume: 1, .. }));
    }

    #[test]
    fn test_source_read_at() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.002");
        std::fs::write(&path, (0u8..50).collect::<Vec<_>>()).unwrap();

        let mut volume = VolumeSource::open(&path, 2, 100).unwrap();
        assert_eq!(volume.size(), 50);
        assert_eq!(volume.global_offset(), 100);
        assert!(volume.contains(100));
        assert!(volume.contains(149));
        assert!(!volume.contains(150));
        assert!(!volume.contains(99));

        let mut buf = [0u8; 100];
        let n = volume.read_at(45, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], &[45, 46, 47, 48, 49]);

        let n = volume.read_at(10, &mut buf[..2]).unwrap();
        assert_eq!(&buf[..n], &[10, 11]);
        assert_eq!(volume.read_at(50, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_source_missing() {
        let dir = TempDir::new().unwrap();
        let err = VolumeSource::open(dir.path().join("nope.001"), 1, 0).unwrap_err();
        assert!(matches!(err, Error::VolumeMissing { volume: 1, .. }));
    }
}
