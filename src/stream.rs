//! Stream backends sharing one read/write/seek contract.
//!
//! An archive engine reads through [`ReadStream`] and writes through
//! [`WriteStream`]. [`InputStream`] and [`OutputStream`] are the tagged
//! backends this crate provides: a single file, an in-memory buffer, a split
//! multi-volume stream, or an externally supplied stream.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::volume::{MultiVolumeReader, MultiVolumeWriter, VolumeConfig, volume_path_for};
use crate::Result;

/// Streams whose logical length can be queried and changed.
pub trait SetSize {
    /// Truncates or extends the stream to `new_size` bytes.
    fn set_size(&mut self, new_size: u64) -> Result<()>;

    /// Returns the logical length of the stream.
    fn size(&self) -> Result<u64>;
}

/// A readable, seekable stream.
pub trait ReadStream: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadStream for T {}

/// A writable, seekable, resizable stream.
pub trait WriteStream: Write + Seek + SetSize {}

impl<T: Write + Seek + SetSize + ?Sized> WriteStream for T {}

impl SetSize for File {
    fn set_size(&mut self, new_size: u64) -> Result<()> {
        self.set_len(new_size)?;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl SetSize for Cursor<Vec<u8>> {
    fn set_size(&mut self, new_size: u64) -> Result<()> {
        let new_size = usize::try_from(new_size)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "buffer size exceeds usize"))?;
        self.get_mut().resize(new_size, 0);
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
}

impl SetSize for MultiVolumeWriter {
    fn set_size(&mut self, new_size: u64) -> Result<()> {
        MultiVolumeWriter::set_size(self, new_size)
    }

    fn size(&self) -> Result<u64> {
        Ok(MultiVolumeWriter::size(self))
    }
}

/// A readable backend.
pub enum InputStream {
    /// A single file.
    File(BufReader<File>),
    /// An in-memory buffer.
    Buffer(Cursor<Vec<u8>>),
    /// A split stream spread over numbered volumes.
    MultiVolume(MultiVolumeReader),
    /// A caller-supplied stream.
    External(Box<dyn ReadStream + Send>),
}

impl InputStream {
    /// Opens a path, detecting split streams.
    ///
    /// A path whose extension is all digits (`name.001`), or a base path for
    /// which `name.001` exists, opens as [`InputStream::MultiVolume`];
    /// anything else opens as a single file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_multivolume(path) {
            return Ok(InputStream::MultiVolume(MultiVolumeReader::open(path)?));
        }
        let file = File::open(path)?;
        Ok(InputStream::File(BufReader::new(file)))
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        InputStream::Buffer(Cursor::new(data.into()))
    }

    /// Wraps a caller-supplied stream.
    pub fn external(stream: impl ReadStream + Send + 'static) -> Self {
        InputStream::External(Box::new(stream))
    }

    /// Returns true if this is a split stream.
    pub fn is_multivolume(&self) -> bool {
        matches!(self, InputStream::MultiVolume(_))
    }
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputStream::File(r) => r.read(buf),
            InputStream::Buffer(r) => r.read(buf),
            InputStream::MultiVolume(r) => r.read(buf),
            InputStream::External(r) => r.read(buf),
        }
    }
}

impl Seek for InputStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            InputStream::File(r) => r.seek(pos),
            InputStream::Buffer(r) => r.seek(pos),
            InputStream::MultiVolume(r) => r.seek(pos),
            InputStream::External(r) => r.seek(pos),
        }
    }
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputStream::File(_) => f.debug_struct("InputStream::File").finish(),
            InputStream::Buffer(c) => f
                .debug_struct("InputStream::Buffer")
                .field("len", &c.get_ref().len())
                .finish(),
            InputStream::MultiVolume(r) => f
                .debug_tuple("InputStream::MultiVolume")
                .field(r)
                .finish(),
            InputStream::External(_) => f.debug_struct("InputStream::External").finish(),
        }
    }
}

/// A writable backend.
pub enum OutputStream {
    /// A single file.
    File(File),
    /// An in-memory buffer.
    Buffer(Cursor<Vec<u8>>),
    /// A split stream spread over numbered volumes.
    MultiVolume(MultiVolumeWriter),
    /// A caller-supplied stream.
    External(Box<dyn WriteStream + Send>),
}

impl OutputStream {
    /// Creates (or truncates) a single output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(OutputStream::File(file))
    }

    /// Creates a split output stream.
    pub fn create_multivolume(config: VolumeConfig) -> Result<Self> {
        Ok(OutputStream::MultiVolume(MultiVolumeWriter::create(config)?))
    }

    /// Creates an empty in-memory buffer.
    pub fn buffer() -> Self {
        OutputStream::Buffer(Cursor::new(Vec::new()))
    }

    /// Wraps a caller-supplied stream.
    pub fn external(stream: impl WriteStream + Send + 'static) -> Self {
        OutputStream::External(Box::new(stream))
    }

    /// Returns the buffered bytes for [`OutputStream::Buffer`].
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            OutputStream::Buffer(c) => Some(c.into_inner()),
            _ => None,
        }
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::File(w) => w.write(buf),
            OutputStream::Buffer(w) => w.write(buf),
            OutputStream::MultiVolume(w) => w.write(buf),
            OutputStream::External(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::File(w) => w.flush(),
            OutputStream::Buffer(w) => w.flush(),
            OutputStream::MultiVolume(w) => w.flush(),
            OutputStream::External(w) => w.flush(),
        }
    }
}

impl Seek for OutputStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            OutputStream::File(w) => w.seek(pos),
            OutputStream::Buffer(w) => w.seek(pos),
            OutputStream::MultiVolume(w) => w.seek(pos),
            OutputStream::External(w) => w.seek(pos),
        }
    }
}

impl SetSize for OutputStream {
    fn set_size(&mut self, new_size: u64) -> Result<()> {
        match self {
            OutputStream::File(w) => w.set_size(new_size),
            OutputStream::Buffer(w) => w.set_size(new_size),
            OutputStream::MultiVolume(w) => SetSize::set_size(w, new_size),
            OutputStream::External(w) => w.set_size(new_size),
        }
    }

    fn size(&self) -> Result<u64> {
        match self {
            OutputStream::File(w) => w.size(),
            OutputStream::Buffer(w) => w.size(),
            OutputStream::MultiVolume(w) => Ok(w.size()),
            OutputStream::External(w) => w.size(),
        }
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputStream::File(_) => f.debug_struct("OutputStream::File").finish(),
            OutputStream::Buffer(c) => f
                .debug_struct("OutputStream::Buffer")
                .field("len", &c.get_ref().len())
                .finish(),
            OutputStream::MultiVolume(w) => f
                .debug_tuple("OutputStream::MultiVolume")
                .field(w)
                .finish(),
            OutputStream::External(_) => f.debug_struct("OutputStream::External").finish(),
        }
    }
}

/// Detects whether a path refers to a split stream.
fn is_multivolume(path: &Path) -> bool {
    if volume_path_for(path, 1).exists() {
        return true;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_multivolume() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("data.bin");
        assert!(is_multivolume(Path::new("archive.7z.001")));
        assert!(is_multivolume(Path::new("archive.7z.017")));
        assert!(!is_multivolume(&base));

        std::fs::write(dir.path().join("data.bin.001"), b"x").unwrap();
        assert!(is_multivolume(&base));

        let dated = dir.path().join("backup.2024");
        std::fs::write(dir.path().join("backup.2024.001"), b"x").unwrap();
        assert!(is_multivolume(&dated));
    }

    #[test]
    fn test_input_stream_variants() {
        let dir = TempDir::new().unwrap();
        let single = dir.path().join("single.bin");
        std::fs::write(&single, b"hello").unwrap();
        std::fs::write(dir.path().join("split.bin.001"), b"hel").unwrap();
        std::fs::write(dir.path().join("split.bin.002"), b"lo").unwrap();

        let mut streams = vec![
            InputStream::open(&single).unwrap(),
            InputStream::open(dir.path().join("split.bin")).unwrap(),
            InputStream::from_bytes(b"hello".to_vec()),
            InputStream::external(Cursor::new(b"hello".to_vec())),
        ];
        assert!(streams[1].is_multivolume());

        for stream in &mut streams {
            stream.seek(SeekFrom::Start(1)).unwrap();
            let mut data = Vec::new();
            stream.read_to_end(&mut data).unwrap();
            assert_eq!(data, b"ello", "{:?}", stream);
        }
    }

    #[test]
    fn test_output_stream_variants() {
        let dir = TempDir::new().unwrap();
        let mut streams = vec![
            OutputStream::create(dir.path().join("out.bin")).unwrap(),
            OutputStream::create_multivolume(VolumeConfig::new(dir.path().join("split.bin"), 4))
                .unwrap(),
            OutputStream::buffer(),
            OutputStream::external(Cursor::new(Vec::new())),
        ];

        for stream in &mut streams {
            stream.write_all(b"0123456789").unwrap();
            stream.seek(SeekFrom::Start(2)).unwrap();
            stream.write_all(b"ab").unwrap();
            stream.set_size(6).unwrap();
            assert_eq!(stream.size().unwrap(), 6, "{:?}", stream);
            stream.flush().unwrap();
        }

        let buffer = streams.remove(2).into_bytes().unwrap();
        assert_eq!(buffer, b"01ab45");

        let mut reader = InputStream::open(dir.path().join("split.bin.001")).unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"01ab45");
        assert_eq!(std::fs::read(dir.path().join("out.bin")).unwrap(), b"01ab45");
    }
}
