//! Duet Response Parsing
//!
//! Turns command acknowledgements, directory listings, file metadata and
//! simulation results into typed values.

use super::fields::{self, FieldPath};
use crate::transport::{Operation, Payload};
use chrono::{DateTime, NaiveDateTime, Utc};
use duetkit_core::{CommandError, DecodeError, DirectoryItem, Error, FileInfo, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Timestamp format used by the firmware's file listings
const LISTING_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Check a response for a device-reported error
///
/// A missing `err` or `err == 0` means success. Any other code becomes a
/// [`CommandError::Rejected`] carrying the device's `message`.
pub fn check_response(operation: Operation, payload: &Payload) -> Result<()> {
    let Some(value) = payload.get("err") else {
        return Ok(());
    };
    let code = fields::integer(value, &FieldPath::root().key("err"))?;
    if code == 0 {
        return Ok(());
    }

    let reason = payload
        .get_str("message")
        .map(str::to_string)
        .unwrap_or_else(|| format!("error code {}", code));
    Err(Error::Command(CommandError::Rejected {
        operation: operation.as_str().to_string(),
        code,
        reason,
    }))
}

/// Join a directory path and an entry name
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Decode a directory listing
///
/// Items are returned directories first, then by name ignoring case.
pub fn parse_directory_listing(
    requested: &str,
    payload: &Payload,
) -> std::result::Result<Vec<DirectoryItem>, DecodeError> {
    let root = FieldPath::root();
    let dir = match payload.get("dir") {
        Some(value) => fields::string(value, &root.key("dir"))?,
        None => requested,
    };

    let entries: &[Value] = match payload.get("files") {
        Some(value) => fields::array(value, &root.key("files"))?.as_slice(),
        None => &[],
    };

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let item = parse_directory_entry(dir, entry, &root.key("files").index(index))?;
        if !seen.insert(item.path.clone()) {
            return Err(DecodeError::DuplicatePath { path: item.path });
        }
        items.push(item);
    }

    items.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(items)
}

fn parse_directory_entry(
    dir: &str,
    entry: &Value,
    path: &FieldPath,
) -> std::result::Result<DirectoryItem, DecodeError> {
    let record = fields::object(entry, path)?;

    let name = match record.get("name") {
        Some(value) => fields::string(value, &path.key("name"))?,
        None => return Err(fields::invalid(&path.key("name"), "missing")),
    };
    if name.is_empty() {
        return Err(fields::invalid(&path.key("name"), "empty name"));
    }

    let is_directory = match record.get("type") {
        Some(value) => match fields::string(value, &path.key("type"))? {
            "d" => true,
            "f" => false,
            other => {
                return Err(DecodeError::UnknownState {
                    field: path.key("type").to_string(),
                    value: other.to_string(),
                })
            }
        },
        None => false,
    };

    let size = match record.get("size") {
        Some(value) => fields::unsigned(value, &path.key("size"))?,
        None => 0,
    };

    let modified = match record.get("date") {
        Some(value) => Some(parse_listing_date(
            fields::string(value, &path.key("date"))?,
            &path.key("date"),
        )?),
        None => None,
    };

    Ok(DirectoryItem {
        name: name.to_string(),
        path: join_path(dir, name),
        is_directory,
        size,
        modified,
    })
}

fn parse_listing_date(
    text: &str,
    path: &FieldPath,
) -> std::result::Result<DateTime<Utc>, DecodeError> {
    NaiveDateTime::parse_from_str(text, LISTING_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| fields::invalid(path, format!("bad timestamp '{}': {}", text, e)))
}

/// Decode file metadata
///
/// `requested` is `None` when asking about the file currently printing; the
/// path then comes from the response's `fileName`.
pub fn parse_file_info(
    requested: Option<&str>,
    payload: &Payload,
) -> std::result::Result<FileInfo, DecodeError> {
    let root = FieldPath::root();
    let length_of = |key: &str| -> std::result::Result<f64, DecodeError> {
        match payload.get(key) {
            Some(value) => fields::length(value, &root.key(key)),
            None => Ok(0.0),
        }
    };

    let reported_name = match payload.get("fileName") {
        Some(value) => Some(fields::string(value, &root.key("fileName"))?),
        None => None,
    };
    let path = requested.or(reported_name).unwrap_or_default().to_string();

    let generator = match payload.get("generatedBy") {
        Some(value) => fields::string(value, &root.key("generatedBy"))?.to_string(),
        None => String::new(),
    };

    let file_size = match payload.get("size") {
        Some(value) => fields::unsigned(value, &root.key("size"))?,
        None => 0,
    };

    let filament_length = match payload.get("filament") {
        Some(value) => {
            let per_extruder = fields::array(value, &root.key("filament"))?;
            per_extruder
                .iter()
                .enumerate()
                .map(|(index, mm)| fields::length(mm, &root.key("filament").index(index)))
                .sum::<std::result::Result<f64, DecodeError>>()?
        }
        None => 0.0,
    };

    Ok(FileInfo {
        path,
        generator,
        file_size,
        height: length_of("height")?,
        layer_height: length_of("layerHeight")?,
        first_layer_height: length_of("firstLayerHeight")?,
        filament_length,
    })
}

/// Decode the duration of the last simulated print
pub fn parse_simulation_time(payload: &Payload) -> std::result::Result<Duration, DecodeError> {
    let path = FieldPath::root().key("seconds");
    match payload.get("seconds") {
        Some(value) => fields::seconds(value, &path),
        None => Err(fields::invalid(&path, "missing")),
    }
}
