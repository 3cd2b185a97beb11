//! Multi-volume reader.

use std::ffi::OsStr;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::volume_path_for;
use super::file_limit::FileLimit;
use super::segment::VolumeSource;
use super::writer::invalid_seek;
use crate::{Error, Result};

/// Trait for readers that can report volume information.
pub trait VolumeReader: Read + Seek {
    /// Returns the total number of volumes.
    fn volume_count(&self) -> u32;

    /// Returns the sizes of all volumes in bytes.
    fn volume_sizes(&self) -> &[u64];

    /// Returns the volume number (1-indexed) holding the current position.
    fn current_volume(&self) -> u32;

    /// Returns the total logical size across all volumes.
    fn total_size(&self) -> u64;
}

/// A reader that presents an existing sequence of volumes as one stream.
///
/// All volumes are discovered and opened up front, so any position can be
/// served: the volume holding the cursor is found by binary search. A single
/// call to [`read`](Read::read) never crosses a volume boundary;
/// [`read_exact`](Read::read_exact) and [`read_to_end`](Read::read_to_end)
/// continue on the next volume.
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Read;
/// use spanio::volume::{MultiVolumeReader, VolumeReader};
///
/// // Open the first volume - other volumes are discovered automatically
/// let mut reader = MultiVolumeReader::open("archive.7z.001")?;
/// println!("{} volumes, {} bytes", reader.volume_count(), reader.total_size());
///
/// let mut data = Vec::new();
/// reader.read_to_end(&mut data)?;
/// # Ok::<(), spanio::Error>(())
/// ```
pub struct MultiVolumeReader {
    /// Open volumes, ordered by global offset.
    volumes: Vec<VolumeSource>,
    /// Size of each volume in bytes.
    volume_sizes: Vec<u64>,
    /// Current position in the logical stream.
    position: u64,
    /// Total size across all volumes.
    total_size: u64,
}

impl MultiVolumeReader {
    /// Opens a multi-volume stream.
    ///
    /// Accepts the path to the first volume (`name.001`) or the base path
    /// (`name`) when `name.001` exists. Following volumes are found by
    /// replacing the numeric extension with the next number until a path
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VolumeMissing`] if the first volume does not exist
    /// or any discovered volume cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_file_limit(path, FileLimit::global())
    }

    /// Opens a multi-volume stream using the given open-file-limit guard.
    pub fn open_with_file_limit(path: impl AsRef<Path>, file_limit: Arc<FileLimit>) -> Result<Self> {
        let (first_path, first_number) = Self::resolve_first_volume(path.as_ref());

        let mut volumes: Vec<VolumeSource> = Vec::new();
        let mut total_size = 0u64;
        let mut number = first_number;
        let mut volume_path = first_path;

        // The first volume must exist; the rest are probed until one is absent.
        loop {
            let volume = VolumeSource::open(&volume_path, number, total_size)?;
            total_size += volume.size();
            volumes.push(volume);
            file_limit.note_open_files(volumes.len());

            number = number
                .checked_add(1)
                .ok_or_else(|| Error::InvalidConfig("volume number overflow".into()))?;
            volume_path = volume_path.with_extension(format!("{:03}", number));
            match std::fs::metadata(&volume_path) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        log::debug!(
            "Discovered {} volumes ({} bytes) starting at '{}'",
            volumes.len(),
            total_size,
            volumes[0].path().display()
        );

        let volume_sizes = volumes.iter().map(VolumeSource::size).collect();
        Ok(Self {
            volumes,
            volume_sizes,
            position: 0,
            total_size,
        })
    }

    /// Maps the user-supplied path to the first volume path and its number.
    ///
    /// An existing `path.001` wins over a numeric extension, so prefixes such
    /// as `backup.2024` reopen from their base path.
    fn resolve_first_volume(path: &Path) -> (PathBuf, u32) {
        let first = volume_path_for(path, 1);
        if first.exists() {
            return (first, 1);
        }

        if let Some(number) = path
            .extension()
            .and_then(OsStr::to_str)
            .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|ext| ext.parse::<u32>().ok())
        {
            return (path.to_path_buf(), number);
        }

        (first, 1)
    }

    /// Returns the path of every volume, in order.
    pub fn volume_paths(&self) -> Vec<PathBuf> {
        self.volumes.iter().map(|v| v.path().to_path_buf()).collect()
    }

    /// Returns the current position in the logical stream.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Finds the volume holding `position`.
    ///
    /// Returns `None` at or past the end of the stream.
    fn locate(&self, position: u64) -> Option<usize> {
        if position >= self.total_size {
            return None;
        }
        let index = self
            .volumes
            .partition_point(|v| v.global_offset() + v.size() <= position);
        debug_assert!(self.volumes[index].contains(position));
        Some(index)
    }
}

impl Read for MultiVolumeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(index) = self.locate(self.position) else {
            return Ok(0);
        };

        let volume = &mut self.volumes[index];
        let local_offset = self.position - volume.global_offset();
        let n = volume.read_at(local_offset, buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "volume {} ended at {} bytes, expected {}",
                    volume.number(),
                    local_offset,
                    volume.size()
                ),
            ));
        }

        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for MultiVolumeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
            SeekFrom::End(d) => self.total_size.checked_add_signed(d),
        };
        let new_pos = new_pos.ok_or_else(|| invalid_seek(pos))?;

        self.position = new_pos.min(self.total_size);
        Ok(self.position)
    }
}

impl VolumeReader for MultiVolumeReader {
    fn volume_count(&self) -> u32 {
        self.volumes.len() as u32
    }

    fn volume_sizes(&self) -> &[u64] {
        &self.volume_sizes
    }

    fn current_volume(&self) -> u32 {
        match self.locate(self.position) {
            Some(index) => self.volumes[index].number(),
            None => self.volumes.last().map_or(0, VolumeSource::number),
        }
    }

    fn total_size(&self) -> u64 {
        self.total_size
    }
}

impl std::fmt::Debug for MultiVolumeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiVolumeReader")
            .field("volume_count", &self.volumes.len())
            .field("total_size", &self.total_size)
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_volumes(dir: &Path, base_name: &str, sizes: &[usize]) -> (PathBuf, Vec<u8>) {
        let base_path = dir.join(base_name);
        let mut all = Vec::new();
        for (i, &size) in sizes.iter().enumerate() {
            let volume_path = PathBuf::from(format!("{}.{:03}", base_path.display(), i + 1));
            let mut file = File::create(&volume_path).unwrap();
            let data: Vec<u8> = (0..size).map(|j| ((i * 7 + j) % 251) as u8).collect();
            file.write_all(&data).unwrap();
            all.extend_from_slice(&data);
        }
        (base_path, all)
    }

    fn first_volume(base_path: &Path) -> PathBuf {
        PathBuf::from(format!("{}.001", base_path.display()))
    }

    #[test]
    fn test_resolve_first_volume() {
        let (path, n) = MultiVolumeReader::resolve_first_volume(Path::new("archive.7z.001"));
        assert_eq!(path, PathBuf::from("archive.7z.001"));
        assert_eq!(n, 1);

        let (path, n) = MultiVolumeReader::resolve_first_volume(Path::new("/a/archive.7z"));
        assert_eq!(path, PathBuf::from("/a/archive.7z.001"));
        assert_eq!(n, 1);

        let (_, n) = MultiVolumeReader::resolve_first_volume(Path::new("data.bin.004"));
        assert_eq!(n, 4);
    }

    #[test]
    fn test_open_multivolume() {
        let dir = TempDir::new().unwrap();
        let (base_path, _) = create_test_volumes(dir.path(), "test.7z", &[100, 100, 50]);

        let reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();

        assert_eq!(reader.volume_count(), 3);
        assert_eq!(reader.volume_sizes(), &[100, 100, 50]);
        assert_eq!(reader.total_size(), 250);
        assert_eq!(reader.current_volume(), 1);
        assert_eq!(reader.volume_paths().len(), 3);
    }

    #[test]
    fn test_open_from_base_path() {
        let dir = TempDir::new().unwrap();
        let (base_path, _) = create_test_volumes(dir.path(), "test.7z", &[10, 5]);

        let reader = MultiVolumeReader::open(&base_path).unwrap();
        assert_eq!(reader.volume_count(), 2);
        assert_eq!(reader.total_size(), 15);
    }

    #[test]
    fn test_read_stops_at_volume_boundary() {
        let dir = TempDir::new().unwrap();
        let (base_path, expected) = create_test_volumes(dir.path(), "test.7z", &[100, 100, 50]);
        let mut reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();

        let mut buffer = vec![0u8; 250];
        assert_eq!(reader.read(&mut buffer).unwrap(), 100);
        assert_eq!(&buffer[..100], &expected[..100]);

        reader.seek(SeekFrom::Start(90)).unwrap();
        assert_eq!(reader.read(&mut buffer).unwrap(), 10);
        assert_eq!(reader.position(), 100);
    }

    #[test]
    fn test_read_across_volumes() {
        let dir = TempDir::new().unwrap();
        let (base_path, expected) = create_test_volumes(dir.path(), "test.7z", &[100, 100, 50]);
        let mut reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();

        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        assert_eq!(data, expected);

        // At the end, reads report end of stream.
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_random_access() {
        let dir = TempDir::new().unwrap();
        let (base_path, expected) = create_test_volumes(dir.path(), "test.7z", &[100, 100, 50]);
        let mut reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();

        for &pos in &[249u64, 0, 150, 99, 100, 200, 17] {
            reader.seek(SeekFrom::Start(pos)).unwrap();
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte).unwrap();
            assert_eq!(byte[0], expected[pos as usize], "position {}", pos);
        }
    }

    #[test]
    fn test_seek_operations() {
        let dir = TempDir::new().unwrap();
        let (base_path, _) = create_test_volumes(dir.path(), "test.7z", &[100, 100, 50]);
        let mut reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();

        assert_eq!(reader.seek(SeekFrom::Start(150)).unwrap(), 150);
        assert_eq!(reader.current_volume(), 2);

        assert_eq!(reader.seek(SeekFrom::Start(0)).unwrap(), 0);
        assert_eq!(reader.current_volume(), 1);

        assert_eq!(reader.seek(SeekFrom::End(-50)).unwrap(), 200);
        assert_eq!(reader.current_volume(), 3);

        reader.seek(SeekFrom::Start(100)).unwrap();
        assert_eq!(reader.seek(SeekFrom::Current(25)).unwrap(), 125);

        // Past the end clamps to the total size.
        assert_eq!(reader.seek(SeekFrom::Start(1000)).unwrap(), 250);
        assert_eq!(reader.current_volume(), 3);
    }

    #[test]
    fn test_seek_underflow_and_overflow() {
        let dir = TempDir::new().unwrap();
        let (base_path, _) = create_test_volumes(dir.path(), "test.7z", &[100, 50]);
        let mut reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();
        reader.seek(SeekFrom::Start(40)).unwrap();

        let err = reader.seek(SeekFrom::Current(-41)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(reader.position(), 40);

        let err = reader.seek(SeekFrom::End(-151)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        reader.seek(SeekFrom::End(0)).unwrap();
        let mut reader_at_max = reader;
        reader_at_max.position = u64::MAX - 1;
        assert!(reader_at_max.seek(SeekFrom::Current(i64::MAX)).is_err());
        assert_eq!(reader_at_max.position(), u64::MAX - 1);
    }

    #[test]
    fn test_no_volumes_error() {
        let dir = TempDir::new().unwrap();
        let result = MultiVolumeReader::open(dir.path().join("nonexistent.7z.001"));
        assert!(matches!(result, Err(Error::VolumeMissing { volume: 1, .. })));
    }

    #[test]
    fn test_gap_stops_discovery() {
        let dir = TempDir::new().unwrap();
        let (base_path, _) = create_test_volumes(dir.path(), "test.7z", &[10, 10, 10]);
        std::fs::remove_file(format!("{}.002", base_path.display())).unwrap();

        let reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();
        assert_eq!(reader.volume_count(), 1);
        assert_eq!(reader.total_size(), 10);
    }

    #[test]
    fn test_empty_volume_in_sequence() {
        let dir = TempDir::new().unwrap();
        let (base_path, expected) = create_test_volumes(dir.path(), "test.7z", &[10, 0, 10]);
        let mut reader = MultiVolumeReader::open(first_volume(&base_path)).unwrap();
        assert_eq!(reader.volume_count(), 3);

        reader.seek(SeekFrom::Start(10)).unwrap();
        assert_eq!(reader.current_volume(), 3);

        reader.seek(SeekFrom::Start(0)).unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        assert_eq!(data, expected);
    }
}
