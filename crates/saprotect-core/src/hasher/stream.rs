use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub const CHUNK_SIZE: usize = 4096; // 4KB
pub const HASH_NAME: &str = "SHA-1";
pub const FINGERPRINT_LEN: usize = 40;

/// Stream a file through SHA-1 `chunk_size` bytes at a time and return the
/// lowercase hex digest. The file handle is closed before returning.
pub fn fingerprint_file(file: &Path, chunk_size: usize) -> io::Result<String> {
    let f = File::open(file)?;
    fingerprint_reader(f, chunk_size)
}

pub fn fingerprint_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buffer = vec![0; chunk_size.max(1)];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn fingerprint_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha1::digest(data))
}
