use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to access checkpoint {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("checkpoint {path} holds {content:?}, expected a stop id")]
    Parse { path: PathBuf, content: String },
}

/// Plain-text marker holding the id of the last stop that was fully processed
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last processed id, or `None` when no marker exists yet
    pub fn load(&self) -> Result<Option<i64>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse()
            .map(Some)
            .map_err(|_| CheckpointError::Parse {
                path: self.path.clone(),
                content: trimmed.to_string(),
            })
    }

    pub fn save(&self, id: i64) -> Result<(), CheckpointError> {
        fs::write(&self.path, id.to_string()).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
