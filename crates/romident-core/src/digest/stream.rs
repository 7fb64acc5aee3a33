use super::FileDigestSet;
use md5::{Digest, Md5};
use sha1::Sha1;
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use tracing::trace;

pub const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Hash a file with CRC32, MD5 and SHA1 in a single pass.
///
/// The size in the result is the number of bytes hashed, not the size reported
/// by the filesystem, so a file that changes between stat and read can never
/// produce digests that disagree with its size.
pub fn digest_file(path: &Path) -> io::Result<FileDigestSet> {
    let file = File::open(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error opening {}: {}", path.display(), err),
        )
    })?;

    digest_reader(path, file).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error reading {}: {}", path.display(), err),
        )
    })
}

/// Feed every byte of `reader` into the three accumulators through a bounded
/// buffer. On a read error nothing is returned; partial digests are dropped.
pub fn digest_reader<R: Read>(path: &Path, mut reader: R) -> io::Result<FileDigestSet> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    let mut crc32_hasher = crc32fast::Hasher::new();
    let mut md5_hasher = Md5::new();
    let mut sha1_hasher = Sha1::new();
    let mut size: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        let chunk = &buffer[..bytes_read];
        crc32_hasher.update(chunk);
        md5_hasher.update(chunk);
        sha1_hasher.update(chunk);
        size += bytes_read as u64;
    }

    trace!("Hashed {} bytes from {}", size, path.display());

    Ok(FileDigestSet {
        path: path.to_path_buf(),
        size,
        crc32: format!("{:08x}", crc32_hasher.finalize()),
        md5: format!("{:032x}", md5_hasher.finalize()),
        sha1: format!("{:040x}", sha1_hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    /// Yields at most one byte per read and interrupts every other call.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
        interrupt_next: bool,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt_next = !self.interrupt_next;
            if self.interrupt_next {
                return Err(io::Error::new(ErrorKind::Interrupted, "interrupted"));
            }
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    /// Returns some bytes and then fails.
    struct BrokenReader {
        served: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(ErrorKind::Other, "device gone"));
            }
            self.served = true;
            buf[0] = b'x';
            Ok(1)
        }
    }

    #[test]
    fn test_known_vectors_abc() {
        let fds = digest_reader(Path::new("abc.bin"), Cursor::new(b"abc".to_vec())).unwrap();
        assert_eq!(fds.size, 3);
        assert_eq!(fds.crc32, "352441c2");
        assert_eq!(fds.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(fds.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_known_vectors_empty() {
        let fds = digest_reader(Path::new("empty.bin"), Cursor::new(Vec::new())).unwrap();
        assert_eq!(fds.size, 0);
        assert_eq!(fds.crc32, "00000000");
        assert_eq!(fds.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(fds.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_chunking_does_not_change_result() {
        let data: Vec<u8> = (0..(READ_BUFFER_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let whole = digest_reader(Path::new("a"), Cursor::new(data.clone())).unwrap();
        let trickled = digest_reader(
            Path::new("a"),
            TrickleReader {
                data: data[..300].to_vec(),
                pos: 0,
                interrupt_next: false,
            },
        )
        .unwrap();
        let prefix = digest_reader(Path::new("a"), Cursor::new(data[..300].to_vec())).unwrap();

        assert_eq!(whole.size, data.len() as u64);
        assert_eq!(trickled, prefix);
    }

    #[test]
    fn test_read_failure_returns_no_digests() {
        let result = digest_reader(Path::new("bad"), BrokenReader { served: false });
        assert!(result.is_err());
    }

    #[test]
    fn test_digest_file_is_deterministic() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"The quick brown fox jumps over the lazy dog").unwrap();
        file.flush().unwrap();

        let first = digest_file(file.path()).unwrap();
        let second = digest_file(file.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.crc32, "414fa339");
        assert_eq!(first.md5, "9e107d9d372bb6826bd81d3542a419d6");
        assert_eq!(first.sha1, "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12");
    }

    #[test]
    fn test_digest_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_file(&dir.path().join("nope.rom")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
