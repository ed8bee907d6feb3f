use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const APP_DIR: &str = "snapstamp";
const SETTINGS_FILE: &str = "config.json";

/// Fallback used when neither `$XDG_CONFIG_HOME` nor `$HOME` resolve.
const RELATIVE_SETTINGS_FALLBACK: &str = "snapstamp_config.json";

const DEFAULT_FILE_PREFIX: &str = "screenshot";
const DEFAULT_FILE_FORMAT: &str = "png";
const DEFAULT_HOTKEY_FULLSCREEN: &str = "print_screen";
const DEFAULT_HOTKEY_REGION: &str = "ctrl+print_screen";
const DEFAULT_WINDOW_GEOMETRY: &str = "640x520+100+100";
const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettingsPathError {
    MissingHomeDirectory,
}

/// Application settings persisted to `config.json`.
///
/// Unknown keys in the file are ignored on load; missing keys fall back to
/// their defaults. The file is fully rewritten, pretty-printed, on every
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub save_directory: PathBuf,
    pub file_prefix: String,
    pub file_format: String,
    pub hotkey_fullscreen: String,
    pub hotkey_region: String,
    pub show_preview: bool,
    pub auto_open_folder: bool,
    pub window_geometry: String,
    pub timestamp_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_directory: default_save_directory(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_format: DEFAULT_FILE_FORMAT.to_string(),
            hotkey_fullscreen: DEFAULT_HOTKEY_FULLSCREEN.to_string(),
            hotkey_region: DEFAULT_HOTKEY_REGION.to_string(),
            show_preview: true,
            auto_open_folder: false,
            window_geometry: DEFAULT_WINDOW_GEOMETRY.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Optional overlay applied atomically by [`SettingsStore::update`].
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub save_directory: Option<PathBuf>,
    pub file_prefix: Option<String>,
    pub file_format: Option<String>,
    pub hotkey_fullscreen: Option<String>,
    pub hotkey_region: Option<String>,
    pub show_preview: Option<bool>,
    pub auto_open_folder: Option<bool>,
    pub window_geometry: Option<String>,
    pub timestamp_format: Option<String>,
}

impl SettingsPatch {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(ref v) = self.save_directory {
            settings.save_directory = v.clone();
        }
        if let Some(ref v) = self.file_prefix {
            settings.file_prefix = v.clone();
        }
        if let Some(ref v) = self.file_format {
            settings.file_format = v.clone();
        }
        if let Some(ref v) = self.hotkey_fullscreen {
            settings.hotkey_fullscreen = v.clone();
        }
        if let Some(ref v) = self.hotkey_region {
            settings.hotkey_region = v.clone();
        }
        if let Some(v) = self.show_preview {
            settings.show_preview = v;
        }
        if let Some(v) = self.auto_open_folder {
            settings.auto_open_folder = v;
        }
        if let Some(ref v) = self.window_geometry {
            settings.window_geometry = v.clone();
        }
        if let Some(ref v) = self.timestamp_format {
            settings.timestamp_format = v.clone();
        }
    }
}

/// Owns the in-memory settings and the file they persist to. Mutations
/// rewrite the file immediately; write failures are diagnostics, never
/// errors for the caller.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load from the default config path; absent or unreadable files fall
    /// back to defaults with a diagnostic.
    pub fn load() -> Self {
        let (xdg_config_home, home) = config_env_dirs();
        let path = settings_path_with(xdg_config_home.as_deref(), home.as_deref())
            .unwrap_or_else(|err| {
                tracing::warn!(?err, "config directory unresolvable; using working directory");
                PathBuf::from(RELATIVE_SETTINGS_FALLBACK)
            });
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Self {
        let settings = read_settings(&path);
        Self { path, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the persisted window geometry string.
    pub fn set_window_geometry(&mut self, geometry: impl Into<String>) {
        self.settings.window_geometry = geometry.into();
        self.persist();
    }

    /// Apply a patch atomically and persist once. An all-`None` patch leaves
    /// every value untouched.
    pub fn update(&mut self, patch: SettingsPatch) {
        patch.apply_to(&mut self.settings);
        self.persist();
    }

    /// Discard all overrides.
    pub fn reset_to_defaults(&mut self) {
        self.settings = Settings::default();
        self.persist();
    }

    fn persist(&self) {
        if let Err(err) = write_settings(&self.path, &self.settings) {
            tracing::warn!(?err, path = %self.path.display(), "failed to persist settings");
        }
    }
}

fn read_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, path = %path.display(), "failed to parse settings; using defaults");
            Settings::default()
        }),
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "failed to read settings; using defaults");
            Settings::default()
        }
    }
}

fn write_settings(path: &Path, settings: &Settings) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let serialized = serde_json::to_string_pretty(settings)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    fs::write(path, serialized)
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn settings_path_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, SettingsPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(APP_DIR);
    path.push(SETTINGS_FILE);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, SettingsPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(SettingsPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

fn default_save_directory() -> PathBuf {
    if let Some(pictures) = dirs::picture_dir() {
        return pictures;
    }
    dirs::home_dir()
        .map(|home| home.join("Pictures"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("snapstamp-settings-{name}-{}", std::process::id()));
        path
    }

    #[test]
    fn settings_path_prefers_xdg_config_home() {
        let path = settings_path_with(Some(Path::new("/tmp/config-root")), Some(Path::new("/tmp/home")))
            .expect("path should resolve");
        assert_eq!(path, PathBuf::from("/tmp/config-root/snapstamp/config.json"));
    }

    #[test]
    fn settings_path_falls_back_to_home_dot_config() {
        let path = settings_path_with(None, Some(Path::new("/tmp/home"))).expect("path should resolve");
        assert_eq!(path, PathBuf::from("/tmp/home/.config/snapstamp/config.json"));
    }

    #[test]
    fn settings_path_errors_when_home_missing_and_xdg_unset() {
        let error = settings_path_with(None, None).unwrap_err();
        assert_eq!(error, SettingsPathError::MissingHomeDirectory);
    }

    #[test]
    fn absent_file_loads_defaults() {
        let store = SettingsStore::load_from(temp_settings_path("absent"));
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let path = temp_settings_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::load_from(path.clone());
        assert_eq!(store.settings(), &Settings::default());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_keys_are_ignored_and_missing_keys_default() {
        let path = temp_settings_path("partial");
        fs::write(
            &path,
            r#"{ "file_prefix": "shot", "legacy_option": true }"#,
        )
        .unwrap();

        let store = SettingsStore::load_from(path.clone());
        assert_eq!(store.settings().file_prefix, "shot");
        assert_eq!(store.settings().file_format, "png");
        assert!(store.settings().show_preview);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn mutations_round_trip_through_the_file() {
        let path = temp_settings_path("roundtrip");
        let mut store = SettingsStore::load_from(path.clone());

        store.update(SettingsPatch {
            file_prefix: Some("shot".to_string()),
            file_format: Some("jpg".to_string()),
            show_preview: Some(false),
            ..SettingsPatch::default()
        });
        store.set_window_geometry("800x600+10+20");

        let reloaded = SettingsStore::load_from(path.clone());
        assert_eq!(reloaded.settings().file_prefix, "shot");
        assert_eq!(reloaded.settings().file_format, "jpg");
        assert!(!reloaded.settings().show_preview);
        assert_eq!(reloaded.settings().window_geometry, "800x600+10+20");
        // untouched keys keep their defaults
        assert_eq!(reloaded.settings().hotkey_fullscreen, "print_screen");
        assert_eq!(reloaded.settings().timestamp_format, "%Y%m%d_%H%M%S");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let path = temp_settings_path("empty-patch");
        let mut store = SettingsStore::load_from(path.clone());
        store.update(SettingsPatch {
            file_prefix: Some("shot".to_string()),
            ..SettingsPatch::default()
        });

        let before = store.settings().clone();
        store.update(SettingsPatch::default());
        assert_eq!(store.settings(), &before);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn reset_discards_all_overrides() {
        let path = temp_settings_path("reset");
        let mut store = SettingsStore::load_from(path.clone());
        store.update(SettingsPatch {
            file_prefix: Some("shot".to_string()),
            auto_open_folder: Some(true),
            ..SettingsPatch::default()
        });

        store.reset_to_defaults();
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(
            SettingsStore::load_from(path.clone()).settings(),
            &Settings::default()
        );

        let _ = fs::remove_file(path);
    }

    #[test]
    fn persisted_file_is_pretty_printed_json() {
        let path = temp_settings_path("pretty");
        let mut store = SettingsStore::load_from(path.clone());
        store.update(SettingsPatch::default());

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\n"));
        assert!(serde_json::from_str::<serde_json::Value>(&contents).is_ok());

        let _ = fs::remove_file(path);
    }
}
