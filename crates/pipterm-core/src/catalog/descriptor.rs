//! `station.ini` parsing.
//!
//! The descriptor is a tiny INI file:
//!
//! ```text
//! [metadata]
//! station_name = Diamond City Radio
//! ordered = false
//! ```
//!
//! Only the `[metadata]` section is read; other sections are tolerated and
//! ignored.  Both keys are optional.

use super::CatalogError;

pub const DESCRIPTOR_FILE: &str = "station.ini";

const METADATA_SECTION: &str = "metadata";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationDescriptor {
    /// Display name; the directory name is used when absent.
    pub station_name: Option<String>,
    pub ordered: bool,
}

pub fn parse_descriptor(content: &str) -> Result<StationDescriptor, CatalogError> {
    let mut descriptor = StationDescriptor::default();
    let mut section: Option<String> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or_else(|| CatalogError::Descriptor {
                line: line_no,
                reason: format!("unterminated section header '{}'", line),
            })?;
            section = Some(name.trim().to_ascii_lowercase());
            continue;
        }

        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            return Err(CatalogError::Descriptor {
                line: line_no,
                reason: format!("expected 'key = value', got '{}'", line),
            });
        };

        let Some(current) = section.as_deref() else {
            return Err(CatalogError::Descriptor {
                line: line_no,
                reason: "key outside of any section".to_string(),
            });
        };
        if current != METADATA_SECTION {
            continue;
        }

        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "station_name" => {
                if !value.is_empty() {
                    descriptor.station_name = Some(value.to_string());
                }
            }
            "ordered" => {
                descriptor.ordered = parse_bool(value).ok_or_else(|| CatalogError::Descriptor {
                    line: line_no,
                    reason: format!("'{}' is not a boolean", value),
                })?;
            }
            _ => {}
        }
    }

    Ok(descriptor)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
