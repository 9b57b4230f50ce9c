//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let abort_on_level_error = if config.pipeline.abort_on_level_error {
        "true"
    } else {
        "false"
    };

    format!(
        r#"[pipeline]
; Zoom levels to generate, inclusive (0-24)
zoom_min = {}
zoom_max = {}
; Tiles extracted and written concurrently (default: 50)
max_concurrency = {}
; Stop after the first level that has failed tiles (default: true)
; When false, every level runs and failures are reported at the end
abort_on_level_error = {}

[window]
; Area to generate, in tile columns/rows at reference_zoom.
; min bounds are inclusive, max bounds exclusive.
; Below reference_zoom the whole level is generated; above it the bounds
; are scaled by 2 per zoom level.
; Default covers metropolitan France at zoom 13.
reference_zoom = {}
x_min = {}
x_max = {}
y_min = {}
y_max = {}

[storage]
; SQLite database receiving the tiles (created if missing)
database = {}
; Destination table, keyed by (z, x, y)
table = {}

[logging]
; Log file, truncated at the start of each run
file = {}
"#,
        config.pipeline.zoom_min,
        config.pipeline.zoom_max,
        config.pipeline.max_concurrency,
        abort_on_level_error,
        config.window.reference_zoom,
        config.window.x_min,
        config.window.x_max,
        config.window.y_min,
        config.window.y_max,
        path_to_string(&config.storage.database),
        config.storage.table,
        path_to_string(&config.logging.file),
    )
}

/// Render a path, collapsing the home directory back to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_written_config_contains_every_section() {
        let content = to_config_string(&ConfigFile::default());

        for section in ["[pipeline]", "[window]", "[storage]", "[logging]"] {
            assert!(content.contains(section), "missing {}", section);
        }
        assert!(content.contains("max_concurrency = 50"));
        assert!(content.contains("x_min = 3900"));
        assert!(content.contains("table = tiles"));
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.pipeline.zoom_min = 3;
        config.pipeline.zoom_max = 11;
        config.pipeline.abort_on_level_error = false;
        config.window.x_min = 3950;
        config.storage.database = PathBuf::from("/srv/tiles/pyramid.sqlite");
        config.storage.table = "pyramid".to_string();

        config.save_to(&path).unwrap();
        let reloaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_home_paths_are_collapsed() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("tiles.sqlite")), "~/tiles.sqlite");
        }
        assert_eq!(path_to_string(Path::new("/abs/tiles.sqlite")), "/abs/tiles.sqlite");
    }
}
