//! JSON state kept between runs.
//!
//! Three documents live on disk: cumulative word counts, the set of DOIs
//! already counted, and the dashboard payload. A missing file loads as empty
//! state. Any other read failure, or a file that is not valid JSON, aborts the
//! run. Writes land in a temporary file beside the target and are renamed over
//! it, so a reader never sees a half-written document.

mod dashboard;

pub use dashboard::{build_dashboard_snapshot, top_words, TIMESTAMP_FORMAT};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use trends_core::{
    CoreError, CumulativeCounts, DashboardSnapshot, SeenIdentifiers, StateError, StatePaths,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub cumulative: CumulativeCounts,
    pub seen: SeenIdentifiers,
}

pub struct StateStore {
    paths: StatePaths,
}

impl StateStore {
    pub fn new(paths: StatePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn load(&self) -> Result<PersistedState, CoreError> {
        let state = PersistedState {
            cumulative: self.load_cumulative()?,
            seen: self.load_seen()?,
        };
        info!(
            "Loaded state: {} words, {} seen identifiers",
            state.cumulative.len(),
            state.seen.len()
        );
        Ok(state)
    }

    pub fn load_cumulative(&self) -> Result<CumulativeCounts, CoreError> {
        Ok(load_json(&self.paths.cumulative_path)?)
    }

    pub fn load_seen(&self) -> Result<SeenIdentifiers, CoreError> {
        Ok(load_json(&self.paths.seen_path)?)
    }

    pub fn save_cumulative(&self, cumulative: &CumulativeCounts) -> Result<(), CoreError> {
        Ok(write_json(&self.paths.cumulative_path, cumulative)?)
    }

    pub fn save_seen(&self, seen: &SeenIdentifiers) -> Result<(), CoreError> {
        Ok(write_json(&self.paths.seen_path, seen)?)
    }

    pub fn save_dashboard(&self, snapshot: &DashboardSnapshot) -> Result<(), CoreError> {
        Ok(write_json(&self.paths.dashboard_path, snapshot)?)
    }

    /// Writes cumulative counts, then seen identifiers, then the dashboard.
    pub fn save(
        &self,
        state: &PersistedState,
        snapshot: &DashboardSnapshot,
    ) -> Result<(), CoreError> {
        self.save_cumulative(&state.cumulative)?;
        self.save_seen(&state.seen)?;
        self.save_dashboard(snapshot)?;
        info!(
            "Saved state: {} words, {} seen identifiers, dashboard with {} words",
            state.cumulative.len(),
            state.seen.len(),
            snapshot.cumulative.len()
        );
        Ok(())
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StateError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found, starting empty", path.display());
            return Ok(T::default());
        }
        Err(source) => {
            return Err(StateError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| StateError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StateError> {
    let write_failed = |source: std::io::Error| StateError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir).map_err(write_failed)?;

    let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(write_failed)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        serde_json::to_writer(&mut writer, value).map_err(|e| write_failed(e.into()))?;
        writer.flush().map_err(write_failed)?;
    }

    temp_file.persist(path).map_err(|e| write_failed(e.error))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
