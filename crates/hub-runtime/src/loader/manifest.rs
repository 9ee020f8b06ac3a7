//! Launch manifest: `[core ]<path> <0|1>` per line.
//!
//! Enabled non-core entries replace the module directory scan. Core entries
//! name in-process plugins, which this hub records but does not load.

use super::LoaderError;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub enabled: bool,
    pub core: bool,
}

impl ManifestEntry {
    /// Module name: the executable's file stem.
    #[must_use]
    pub fn module_name(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }
}

#[must_use]
pub fn parse(text: &str) -> Vec<ManifestEntry> {
    text.lines()
        .filter_map(|raw| {
            let line = raw.trim();
            if line.is_empty() {
                return None;
            }
            let (core, rest) = match line.strip_prefix("core ") {
                Some(rest) => (true, rest.trim_start()),
                None => (false, line),
            };
            // paths may contain spaces; the flag is the last field
            let Some((path, flag)) = rest.rsplit_once(char::is_whitespace) else {
                debug!(line = %raw, "Skipping manifest line");
                return None;
            };
            let Ok(flag) = flag.parse::<u32>() else {
                debug!(line = %raw, "Skipping manifest line");
                return None;
            };
            Some(ManifestEntry {
                path: PathBuf::from(path.trim_end()),
                enabled: flag > 0,
                core,
            })
        })
        .collect()
}

pub fn load(path: &Path) -> Result<Vec<ManifestEntry>, LoaderError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, &e))?;
    Ok(parse(&text))
}
