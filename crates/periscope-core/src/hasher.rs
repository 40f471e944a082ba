use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub const SHORT_HASH_LEN: usize = 8;
pub const FULL_HASH_LEN: usize = 32;

const SHORT_CHUNK_SIZE: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 1024 * 1024;

/// Hash of the first 4 KiB of the file (or the whole file if shorter),
/// keyed by the file's size so that files of different sizes can never
/// share a short hash. Returns the leading 8 bytes of the digest.
pub fn short_hash(path: &Path, size: u64) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; SHORT_CHUNK_SIZE];
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    let mut hasher = blake3::Hasher::new_keyed(&short_key(size));
    hasher.update(&buf[..filled]);
    Ok(hasher.finalize().as_bytes()[..SHORT_HASH_LEN].to_vec())
}

/// Keyed digest over the entire file content, streamed in 1 MiB chunks.
pub fn full_hash(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new_keyed(&[0u8; 32]);
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().as_bytes().to_vec())
}

fn short_key(size: u64) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..8].copy_from_slice(&size.to_le_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_identical_content_hashes_equal() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_file(tmp.path(), "a", b"some content here");
        let b = write_file(tmp.path(), "b", b"some content here");
        assert_eq!(short_hash(&a, 17).unwrap(), short_hash(&b, 17).unwrap());
        assert_eq!(full_hash(&a).unwrap(), full_hash(&b).unwrap());
        assert_eq!(short_hash(&a, 17).unwrap().len(), SHORT_HASH_LEN);
        assert_eq!(full_hash(&a).unwrap().len(), FULL_HASH_LEN);
    }

    #[test]
    fn test_short_hash_keyed_by_size() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_file(tmp.path(), "a", b"same prefix");
        // same content hashed under different size keys must differ
        assert_ne!(short_hash(&a, 11).unwrap(), short_hash(&a, 12).unwrap());
    }

    #[test]
    fn test_short_hash_reads_only_leading_chunk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut content_a = vec![0x5a; SHORT_CHUNK_SIZE + 100];
        let mut content_b = content_a.clone();
        content_a[SHORT_CHUNK_SIZE + 50] = 1;
        content_b[SHORT_CHUNK_SIZE + 50] = 2;
        let size = content_a.len() as u64;
        let a = write_file(tmp.path(), "a", &content_a);
        let b = write_file(tmp.path(), "b", &content_b);
        assert_eq!(short_hash(&a, size).unwrap(), short_hash(&b, size).unwrap());
        assert_ne!(full_hash(&a).unwrap(), full_hash(&b).unwrap());
    }

    #[test]
    fn test_missing_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(short_hash(&tmp.path().join("nope"), 1).is_err());
        assert!(full_hash(&tmp.path().join("nope")).is_err());
    }
}
