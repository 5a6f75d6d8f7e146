//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Ports that can be recorded and replayed, in session file order.
pub const RECORDED_PORTS: [&str; 5] = ["clock", "id_gen", "edit", "link", "revisions"];

/// Per-port cassette file paths. Ports without a cassette path panic if
/// called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Path to the clock port cassette file.
    pub clock: Option<PathBuf>,
    /// Path to the ID generator port cassette file.
    pub id_gen: Option<PathBuf>,
    /// Path to the edit service cassette file.
    pub edit: Option<PathBuf>,
    /// Path to the link service cassette file.
    pub link: Option<PathBuf>,
    /// Path to the revision directory cassette file.
    pub revisions: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
pub struct PortReplayers {
    /// Replayer for the clock port.
    pub clock: Option<CassetteReplayer>,
    /// Replayer for the ID generator port.
    pub id_gen: Option<CassetteReplayer>,
    /// Replayer for the edit service.
    pub edit: Option<CassetteReplayer>,
    /// Replayer for the link service.
    pub link: Option<CassetteReplayer>,
    /// Replayer for the revision directory.
    pub revisions: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Returns a config where all port paths are `None`.
    #[must_use]
    pub fn panic_on_unspecified() -> Self {
        Self::default()
    }

    /// Picks up `<port>.cassette.yaml` files from a recording session
    /// directory. Missing files leave the port unconfigured.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let pick = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.exists().then_some(path)
        };
        Self {
            clock: pick("clock"),
            id_gen: pick("id_gen"),
            edit: pick("edit"),
            link: pick("link"),
            revisions: pick("revisions"),
        }
    }

    /// Load a cassette file and create a replayer for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette = Cassette::from_yaml(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        Ok(CassetteReplayer::new(&cassette))
    }

    /// Load all configured per-port cassette files and create replayers.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        let load = |path: &Option<PathBuf>| path.as_deref().map(Self::load_cassette).transpose();
        Ok(PortReplayers {
            clock: load(&self.clock)?,
            id_gen: load(&self.id_gen)?,
            edit: load(&self.edit)?,
            link: load(&self.link)?,
            revisions: load(&self.revisions)?,
        })
    }
}
