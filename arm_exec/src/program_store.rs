//! # Program Store
//!
//! The user's program (groups and instructions) is kept in a single pretty-printed JSON file which
//! is read and written as a whole.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use comms_if::program::ProgramData;
use log::{debug, info};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Persistent store for the program.
#[derive(Debug, Clone)]
pub struct ProgramStore {
    path: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Could not read the program file {0:?}: {1}")]
    ReadError(PathBuf, std::io::Error),

    #[error("Could not write the program file {0:?}: {1}")]
    WriteError(PathBuf, std::io::Error),

    #[error("Could not parse the program file {0:?}: {1}")]
    ParseError(PathBuf, serde_json::Error),

    #[error("Could not serialize the program: {0}")]
    SerializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ProgramStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the program. If the file doesn't exist yet an empty program is returned.
    pub fn load(&self) -> Result<ProgramData, StoreError> {
        let data_str = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No program file at {:?}, using an empty program", self.path);
                return Ok(ProgramData::default());
            }
            Err(e) => return Err(StoreError::ReadError(self.path.clone(), e)),
        };

        serde_json::from_str(&data_str).map_err(|e| StoreError::ParseError(self.path.clone(), e))
    }

    /// Replace the stored program.
    pub fn save(&self, data: &ProgramData) -> Result<(), StoreError> {
        let data_str = serde_json::to_string_pretty(data).map_err(StoreError::SerializeError)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteError(self.path.clone(), e))?;
        }

        fs::write(&self.path, data_str).map_err(|e| StoreError::WriteError(self.path.clone(), e))?;

        info!(
            "Program saved: {} groups, {} instructions",
            data.groups.len(),
            data.instructions.len()
        );

        Ok(())
    }
}
