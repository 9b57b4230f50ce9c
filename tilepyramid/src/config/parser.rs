//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{window_error, ConfigFileError};
use super::settings::ConfigFile;
use crate::coord::{BoundingWindow, MAX_ZOOM};
use crate::store::validate_table_name;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [pipeline] section
    if let Some(section) = ini.section(Some("pipeline")) {
        if let Some(v) = section.get("zoom_min") {
            config.pipeline.zoom_min = parse_zoom("pipeline", "zoom_min", v)?;
        }
        if let Some(v) = section.get("zoom_max") {
            config.pipeline.zoom_max = parse_zoom("pipeline", "zoom_max", v)?;
        }
        if let Some(v) = section.get("max_concurrency") {
            let n: usize = parse_number("pipeline", "max_concurrency", v)?;
            if n == 0 {
                return Err(invalid(
                    "pipeline",
                    "max_concurrency",
                    v,
                    "must be at least 1",
                ));
            }
            config.pipeline.max_concurrency = n;
        }
        if let Some(v) = section.get("abort_on_level_error") {
            config.pipeline.abort_on_level_error = parse_bool(v);
        }
    }

    // [window] section
    if let Some(section) = ini.section(Some("window")) {
        if let Some(v) = section.get("reference_zoom") {
            config.window.reference_zoom = parse_zoom("window", "reference_zoom", v)?;
        }
        if let Some(v) = section.get("x_min") {
            config.window.x_min = parse_number("window", "x_min", v)?;
        }
        if let Some(v) = section.get("x_max") {
            config.window.x_max = parse_number("window", "x_max", v)?;
        }
        if let Some(v) = section.get("y_min") {
            config.window.y_min = parse_number("window", "y_min", v)?;
        }
        if let Some(v) = section.get("y_max") {
            config.window.y_max = parse_number("window", "y_max", v)?;
        }
    }

    let w = &config.window;
    BoundingWindow::new(w.reference_zoom, w.x_min, w.x_max, w.y_min, w.y_max)
        .map_err(|e| window_error(&e, w))?;

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("database") {
            let v = v.trim();
            if !v.is_empty() {
                config.storage.database = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("table") {
            let v = v.trim();
            validate_table_name(v).map_err(|_| {
                invalid(
                    "storage",
                    "table",
                    v,
                    "must start with a letter or '_' and contain only letters, digits or '_'",
                )
            })?;
            config.storage.table = v.to_string();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_zoom(section: &str, key: &str, value: &str) -> Result<u8, ConfigFileError> {
    let zoom: u8 = value.trim().parse().map_err(|_| {
        invalid(
            section,
            key,
            value,
            &format!("must be an integer between 0 and {}", MAX_ZOOM),
        )
    })?;
    if zoom > MAX_ZOOM {
        return Err(invalid(
            section,
            key,
            value,
            &format!("must be an integer between 0 and {}", MAX_ZOOM),
        ));
    }
    Ok(zoom)
}

/// Parse a boolean value from config.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
