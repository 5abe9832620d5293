//! Directory listing items and file metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File extensions treated as G-code when deriving display names
const GCODE_EXTENSIONS: [&str; 4] = ["g", "gc", "gcode", "nc"];

/// Derive a human-friendly name from a file or directory name
///
/// Directories keep their name; G-code files lose their extension.
pub fn display_name_for(name: &str, is_directory: bool) -> String {
    if is_directory {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && GCODE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            stem.to_string()
        }
        _ => name.to_string(),
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryItem {
    /// Entry name
    pub name: String,
    /// Full server path; unique within a listing
    pub path: String,
    /// True for directories
    pub is_directory: bool,
    /// Size in bytes (meaningful for files only)
    pub size: u64,
    /// Last modification time, when reported
    pub modified: Option<DateTime<Utc>>,
}

impl DirectoryItem {
    /// Name shown to users
    pub fn display_name(&self) -> String {
        display_name_for(&self.name, self.is_directory)
    }
}

/// Print-relevant metadata the firmware extracted from a G-code file
///
/// Every field defaults to zero/empty when the firmware could not
/// determine it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileInfo {
    /// File path
    pub path: String,
    /// Slicer that produced the file
    pub generator: String,
    /// File size in bytes
    pub file_size: u64,
    /// Object height in mm
    pub height: f64,
    /// Layer height in mm
    pub layer_height: f64,
    /// First layer height in mm
    pub first_layer_height: f64,
    /// Total filament length in mm across all extruders
    pub filament_length: f64,
}

impl FileInfo {
    /// Name shown to users, derived from the last path component
    pub fn display_name(&self) -> String {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        display_name_for(name, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_gcode_extension() {
        assert_eq!(display_name_for("benchy.gcode", false), "benchy");
        assert_eq!(display_name_for("Part.G", false), "Part");
        assert_eq!(display_name_for("notes.txt", false), "notes.txt");
        assert_eq!(display_name_for(".g", false), ".g");
        assert_eq!(display_name_for("macros.g", true), "macros.g");
    }

    #[test]
    fn test_file_info_display_name() {
        let info = FileInfo {
            path: "0:/gcodes/parts/bracket.gcode".to_string(),
            ..Default::default()
        };
        assert_eq!(info.display_name(), "bracket");
    }
}
