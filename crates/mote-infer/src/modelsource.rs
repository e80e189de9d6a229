use crate::InferError;
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::PathBuf;

/// Where the model artifact comes from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

impl ModelSource {
    /// Make the artifact bytes available. Files are memory-mapped read-only.
    pub fn load(self) -> Result<ModelArtifact, InferError> {
        let artifact = match self {
            ModelSource::File(path) => {
                let file = File::open(&path).map_err(|e| {
                    InferError::ModelLoad(format!("failed to open {}: {e}", path.display()))
                })?;
                if file.metadata()?.len() == 0 {
                    return Err(InferError::ModelLoad(format!(
                        "{} is empty",
                        path.display()
                    )));
                }
                // SAFETY: the file is opened read-only and the map is never
                // written through; the artifact must not be modified on disk
                // while the process runs.
                let map = unsafe { Mmap::map(&file) }.map_err(|e| {
                    InferError::ModelLoad(format!("failed to map {}: {e}", path.display()))
                })?;
                log::debug!("mapped model {} ({} bytes)", path.display(), map.len());
                ModelArtifact::Mapped(map)
            }
            ModelSource::Memory(bytes) => {
                if bytes.is_empty() {
                    return Err(InferError::ModelLoad("model buffer is empty".to_string()));
                }
                ModelArtifact::Owned(bytes)
            }
        };
        Ok(artifact)
    }
}

/// Opaque model bytes handed to a backend.
#[derive(Debug)]
pub enum ModelArtifact {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ModelArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ModelArtifact::Mapped(map) => &map[..],
            ModelArtifact::Owned(bytes) => bytes.as_slice(),
        }
    }
}

impl Deref for ModelArtifact {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}
