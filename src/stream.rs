//! Stream abstraction shared by all engines.
//!
//! Sessions own their streams as [`MediaStream`] values: boxed, seekable
//! byte streams behind a concrete type, so the same engine code runs over
//! files and over in-memory cursors in tests.

use std::io::{Read, Seek, SeekFrom, Write};

trait RawStream: Read + Write + Seek {}

impl<T: Read + Write + Seek> RawStream for T {}

/// A seekable byte stream a session can own: a `File`, a `Cursor<Vec<u8>>`,
/// anything that reads, writes and seeks.
pub struct MediaStream {
    inner: Box<dyn RawStream>,
}

impl MediaStream {
    pub fn new<S: Read + Write + Seek + 'static>(inner: S) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Read for MediaStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for MediaStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for MediaStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Copy exactly `n` bytes from `src` to `dst`. A short read is an error,
/// there is no partial-result recovery anywhere in the library.
pub fn copy_bytes<R, W>(src: &mut R, dst: &mut W, mut n: u64) -> std::io::Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; 8192];
    while n > 0 {
        let want = buf.len().min(n as usize);
        src.read_exact(&mut buf[..want])?;
        dst.write_all(&buf[..want])?;
        n -= want as u64;
    }
    Ok(())
}

/// Total length of a seekable stream; the read position is restored.
pub fn stream_len<S: Seek + ?Sized>(stream: &mut S) -> std::io::Result<u64> {
    let pos = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(pos))?;
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn copies_exact_byte_counts() {
        let mut src = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let mut dst = Cursor::new(Vec::new());
        copy_bytes(&mut src, &mut dst, 3).unwrap();
        assert_eq!(dst.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn short_source_is_an_error() {
        let mut src = Cursor::new(vec![1u8, 2]);
        let mut dst = Cursor::new(Vec::new());
        assert!(copy_bytes(&mut src, &mut dst, 3).is_err());
    }

    #[test]
    fn stream_len_preserves_position() {
        let mut s = Cursor::new(vec![0u8; 10]);
        s.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(stream_len(&mut s).unwrap(), 10);
        assert_eq!(s.stream_position().unwrap(), 4);
    }

    #[test]
    fn media_stream_forwards_io() {
        let mut s = MediaStream::new(Cursor::new(Vec::new()));
        s.write_all(b"abc").unwrap();
        s.seek(SeekFrom::Start(1)).unwrap();
        let mut buf = [0u8; 2];
        s.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"bc");
    }
}
