use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use sha2::{Digest, Sha256};

use super::progress::{ProgressReporter, SilentProgress, Stage};
use crate::error::{IoContext, Result};

const CHUNK_SIZE: usize = 1024 * 1024;

pub fn compute_sha256(path: &Path) -> Result<String> {
    compute_sha256_with_progress(path, &mut SilentProgress)
}

/// Hex SHA-256 of a file, read in 1 MiB chunks.
pub fn compute_sha256_with_progress(
    path: &Path,
    progress: &mut dyn ProgressReporter,
) -> Result<String> {
    let file = File::open(path)
        .io_context(|| format!("open file for hashing: {}", path.display()))?;
    let total = file
        .metadata()
        .io_context(|| format!("stat {}", path.display()))?
        .len();
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut read_so_far = 0u64;

    progress.begin(Stage::Verifying);
    loop {
        let read = reader.read(&mut buffer).io_context(|| "hash read")?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        read_so_far += read as u64;
        progress.advance(Stage::Verifying, read_so_far, Some(total));
    }
    progress.finish(Stage::Verifying);

    let hash = hasher.finalize();
    Ok(format!("{:x}", hash))
}

/// Hex digests from registries are not guaranteed to be lowercase.
#[must_use]
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(u64, Option<u64>)>,
    }

    impl ProgressReporter for Recorder {
        fn advance(&mut self, _stage: Stage, done: u64, total: Option<u64>) {
            self.calls.push((done, total));
        }
    }

    #[test]
    fn known_digest_of_abc() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            compute_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn same_content_same_digest_one_byte_changes_it() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        let mut bytes = vec![7u8; 3 * CHUNK_SIZE / 2];
        fs::write(&first, &bytes).unwrap();
        fs::write(&second, &bytes).unwrap();
        assert_eq!(compute_sha256(&first).unwrap(), compute_sha256(&second).unwrap());

        bytes[1000] ^= 0x01;
        fs::write(&second, &bytes).unwrap();
        assert_ne!(compute_sha256(&first).unwrap(), compute_sha256(&second).unwrap());
    }

    #[test]
    fn progress_reports_each_chunk_against_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let size = (2 * CHUNK_SIZE + 10) as u64;
        fs::write(&path, vec![1u8; size as usize]).unwrap();

        let mut recorder = Recorder::default();
        compute_sha256_with_progress(&path, &mut recorder).unwrap();
        let last = recorder.calls.last().copied().unwrap();
        assert_eq!(last, (size, Some(size)));
        assert!(recorder.calls.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = compute_sha256(Path::new("/definitely/missing/file.zip")).unwrap_err();
        assert!(matches!(err, crate::HubError::Io { .. }));
    }

    #[test]
    fn comparison_ignores_hex_case() {
        assert!(checksums_match("ABCDEF01", "abcdef01"));
        assert!(!checksums_match("abcdef01", "abcdef02"));
    }
}
