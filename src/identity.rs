//! Per-device voter identifier.
//!
//! The id is generated once and kept in a local file so repeat visits reuse
//! it. It is a deduplication hint only: anyone can delete the file or vote
//! from another device, and nothing ties it to a real person. That keeps the
//! poll anonymous; do not treat it as authentication.

use log::{info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Builder;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("could not read device id from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not save device id to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Random v4 UUID, or a time-seeded id when the OS has no randomness to
    /// offer.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => Self(Builder::from_random_bytes(bytes).into_uuid().to_string()),
            Err(e) => {
                warn!("No OS randomness ({}), using time-seeded device id", e);
                Self::time_seeded(SystemTime::now())
            }
        }
    }

    fn time_seeded(now: SystemTime) -> Self {
        let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
        let nanos = u64::from(since_epoch.subsec_nanos())
            ^ u64::from(std::process::id()).rotate_left(32);
        Self(format!("u_{}_{}", base36(nanos), since_epoch.as_millis()))
    }

    /// Reads the persisted id at `path`, creating and saving one if there is
    /// none yet.
    pub fn load_or_create(path: &Path) -> Result<Self, IdentityError> {
        match fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => {
                return Ok(Self(contents.trim().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(IdentityError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        let id = Self::generate();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| IdentityError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, &id.0).map_err(|source| IdentityError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Created device id at {}", path.display());

        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn fixed(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
