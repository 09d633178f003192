//! Game controller mapping files, one SDL mapping string per line:
//! `GUID,name,button:binding,...`.

use std::{fs, io, path::Path};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("mapping has no GUID")]
    MissingGuid,

    #[error("mapping for {0} has no name")]
    MissingName(String),

    #[error("mapping for {0} has no bindings")]
    MissingBindings(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerMapping {
    pub guid: String,
    pub name: String,
    /// The whole line, as the backend wants it.
    pub line: String,
}

impl ControllerMapping {
    pub fn parse(line: &str) -> Result<Self, MappingError> {
        let line = line.trim();
        let mut fields = line.splitn(3, ',');

        let guid = fields.next().unwrap_or("").trim();
        if guid.is_empty() {
            return Err(MappingError::MissingGuid);
        }
        let name = fields.next().unwrap_or("").trim();
        if name.is_empty() {
            return Err(MappingError::MissingName(guid.to_string()));
        }
        let bindings = fields.next().unwrap_or("");
        if !bindings.split(',').any(|binding| binding.contains(':')) {
            return Err(MappingError::MissingBindings(guid.to_string()));
        }

        Ok(Self {
            guid: guid.to_string(),
            name: name.to_string(),
            line: line.to_string(),
        })
    }
}

/// Parses every usable line. Blank lines and `#` comments are skipped;
/// malformed lines are logged and skipped.
pub fn parse_controller_mappings(contents: &str) -> Vec<ControllerMapping> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(index, line)| match ControllerMapping::parse(line) {
            Ok(mapping) => Some(mapping),
            Err(e) => {
                warn!("Failed to add mapping on line {}: {}", index + 1, e);
                None
            }
        })
        .collect()
}

/// A missing or unreadable file is not fatal: the controllers just use
/// whatever mappings the backend already knows.
pub fn load_controller_mappings<P: AsRef<Path>>(path: P) -> Vec<ControllerMapping> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => {
            let mappings = parse_controller_mappings(&contents);
            info!(
                "Loaded {} controller mappings from {}",
                mappings.len(),
                path.display()
            );
            mappings
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Controller mapping file {} not found", path.display());
            Vec::new()
        }
        Err(e) => {
            warn!(
                "Failed to open controller mapping file {}: {}",
                path.display(),
                e
            );
            Vec::new()
        }
    }
}
