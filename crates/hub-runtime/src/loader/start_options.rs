//! `ModuleStartOptions` file: one `<module> <0|1>` record per line.

use super::{LoaderError, StartType};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Parse start options. Malformed lines are skipped.
#[must_use]
pub fn parse(text: &str) -> BTreeMap<String, StartType> {
    let mut options = BTreeMap::new();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(value)) = (fields.next(), fields.next()) else {
            if !line.trim().is_empty() {
                debug!(line = %line, "Skipping start option line");
            }
            continue;
        };
        let Ok(value) = value.parse::<u32>() else {
            debug!(line = %line, "Skipping start option line");
            continue;
        };
        let start_type = if value > 0 {
            StartType::Hot
        } else {
            StartType::Cold
        };
        options.insert(name.to_string(), start_type);
    }
    options
}

#[must_use]
pub fn render(options: &BTreeMap<String, StartType>) -> String {
    options
        .iter()
        .map(|(name, start_type)| format!("{name} {}\n", u8::from(*start_type == StartType::Hot)))
        .collect()
}

/// Read the options file; a missing file means no options.
pub fn load(path: &Path) -> Result<BTreeMap<String, StartType>, LoaderError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(LoaderError::io(path, &e)),
    }
}

pub fn save(path: &Path, options: &BTreeMap<String, StartType>) -> Result<(), LoaderError> {
    std::fs::write(path, render(options)).map_err(|e| LoaderError::io(path, &e))
}
