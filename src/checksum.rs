use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("File modified during checksumming: {0}")]
    ConcurrentModification(PathBuf),
}

impl ChecksumError {
    fn from_io(path: &Path, e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            ChecksumError::PermissionDenied(path.to_path_buf())
        } else {
            ChecksumError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    }
}

/// Computes the hex encoded SHA-256 digest of a file's full contents.
///
/// The modification time is sampled before and after reading purely to catch
/// a writer racing the read; it never contributes to the digest itself.
///
/// # Errors
/// - `ChecksumError::Io`: File doesn't exist or other I/O errors
/// - `ChecksumError::PermissionDenied`: Insufficient permissions to read the file
/// - `ChecksumError::ConcurrentModification`: The file was detected as being modified
///   while checksumming. The absence of this error is *not* a guarantee that the
///   file was left alone.
pub fn checksum_file(path: &Path) -> Result<String, ChecksumError> {
    info!("Checksumming {}", path.display());

    let mtime_before = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| ChecksumError::from_io(path, e))?;

    let mut file = File::open(path).map_err(|e| ChecksumError::from_io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ChecksumError::from_io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let mtime_after = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| ChecksumError::from_io(path, e))?;

    if mtime_before != mtime_after {
        return Err(ChecksumError::ConcurrentModification(path.to_path_buf()));
    }

    let digest = format!("{:x}", hasher.finalize());

    debug!("Checksum of {} is {}", path.display(), digest);

    Ok(digest)
}
