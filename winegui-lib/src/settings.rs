//! Application and per-bottle settings
//!
//! Both files are small INI key files. They are read with the `config` crate
//! and written back by hand, so a missing file is recreated with defaults.

use crate::discovery;
use crate::error::{Result, WineGuiError};
use config::{Config, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const GENERAL_CONFIG_FILE: &str = "config.ini";
const BOTTLE_CONFIG_FILE: &str = "winegui.ini";

/// WineGUI storage directory (`~/.winegui`)
pub fn winegui_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".winegui"))
        .ok_or_else(|| WineGuiError::Config("Could not determine home directory".into()))
}

/// Parse an optional INI file. A file that fails to parse is reported and
/// treated as absent.
fn load_ini(file_path: &Path) -> Option<Config> {
    if !file_path.is_file() {
        return None;
    }
    let source = File::new(&file_path.to_string_lossy(), FileFormat::Ini).required(false);
    match Config::builder().add_source(source).build() {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Could not load {:?}, using defaults: {}", file_path, e);
            None
        }
    }
}

/// Key lookup that tolerates the INI parser lowercasing section and key names
fn lookup<T>(
    config: &Config,
    section: &str,
    key: &str,
    get: impl Fn(&Config, &str) -> std::result::Result<T, config::ConfigError>,
) -> Option<T> {
    let path = format!("{}.{}", section, key);
    get(config, &path)
        .or_else(|_| get(config, &path.to_lowercase()))
        .ok()
}

/// Quote a value so the INI reader hands it back unchanged, including
/// surrounding whitespace and embedded quotes
fn quote_ini(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

/// Settings shared by every bottle (`~/.winegui/config.ini`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Directory holding the bottles
    pub default_folder: PathBuf,

    /// Also list the default Wine bottle (`~/.wine`)
    pub display_default_wine_machine: bool,

    /// Run `wine64` instead of `wine`
    pub prefer_wine64: bool,

    /// Log to stderr
    pub enable_logging_stderr: bool,
}

impl GeneralSettings {
    /// Defaults rooted at `winegui_dir`
    pub fn defaults_in(winegui_dir: &Path) -> Self {
        Self {
            default_folder: winegui_dir.join("prefixes"),
            display_default_wine_machine: true,
            prefer_wine64: false,
            enable_logging_stderr: true,
        }
    }

    /// Load `~/.winegui/config.ini`, creating it with defaults when missing
    pub fn load() -> Result<Self> {
        let dir = winegui_dir()?;
        Self::load_from(&dir.join(GENERAL_CONFIG_FILE), &dir)
    }

    /// Load settings from `file_path`, with defaults rooted at `winegui_dir`
    pub fn load_from(file_path: &Path, winegui_dir: &Path) -> Result<Self> {
        let defaults = Self::defaults_in(winegui_dir);

        if !file_path.is_file() {
            info!("Creating default settings file {:?}", file_path);
            defaults.save_to(file_path)?;
            return Ok(defaults);
        }

        let Some(config) = load_ini(file_path) else {
            return Ok(defaults);
        };

        Ok(Self {
            default_folder: lookup(&config, "General", "DefaultFolder", Config::get_string)
                .map(PathBuf::from)
                .unwrap_or(defaults.default_folder),
            display_default_wine_machine: lookup(
                &config,
                "General",
                "DisplayDefaultWineMachine",
                Config::get_bool,
            )
            .unwrap_or(defaults.display_default_wine_machine),
            prefer_wine64: lookup(&config, "General", "PreferWine64", Config::get_bool)
                .unwrap_or(defaults.prefer_wine64),
            enable_logging_stderr: lookup(&config, "General", "EnableLoggingStderr", Config::get_bool)
                .unwrap_or(defaults.enable_logging_stderr),
        })
    }

    /// Write the settings as an INI file
    pub fn save_to(&self, file_path: &Path) -> Result<()> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = format!(
            "[General]\nDefaultFolder={}\nDisplayDefaultWineMachine={}\nPreferWine64={}\nEnableLoggingStderr={}\n",
            quote_ini(&self.default_folder.to_string_lossy()),
            self.display_default_wine_machine,
            self.prefer_wine64,
            self.enable_logging_stderr,
        );
        std::fs::write(file_path, contents)?;
        Ok(())
    }
}

/// Per-bottle settings (`<prefix>/winegui.ini`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleSettings {
    pub name: String,
    pub description: String,
    pub logging_enabled: bool,

    /// Wine debug level, see [`crate::wine::winedebug_for_level`]
    pub debug_log_level: i32,
}

impl BottleSettings {
    pub fn defaults_for(prefix: &Path) -> Self {
        Self {
            name: discovery::folder_name(prefix),
            description: String::new(),
            logging_enabled: false,
            debug_log_level: 1,
        }
    }

    /// Read the bottle settings without touching the disk when they are
    /// missing or unreadable
    pub fn read(prefix: &Path) -> Self {
        let defaults = Self::defaults_for(prefix);
        let Some(config) = load_ini(&prefix.join(BOTTLE_CONFIG_FILE)) else {
            return defaults;
        };

        Self {
            name: lookup(&config, "General", "Name", Config::get_string).unwrap_or(defaults.name),
            description: lookup(&config, "General", "Description", Config::get_string)
                .unwrap_or(defaults.description),
            logging_enabled: lookup(&config, "Logging", "Enabled", Config::get_bool)
                .unwrap_or(defaults.logging_enabled),
            debug_log_level: lookup(&config, "Logging", "DebugLevel", Config::get_int)
                .and_then(|level| i32::try_from(level).ok())
                .unwrap_or(defaults.debug_log_level),
        }
    }

    /// Like [`BottleSettings::read`], but writes the defaults when the
    /// settings file does not exist yet
    pub fn load_or_create(prefix: &Path) -> Result<Self> {
        if prefix.join(BOTTLE_CONFIG_FILE).is_file() {
            return Ok(Self::read(prefix));
        }
        let defaults = Self::defaults_for(prefix);
        defaults.save(prefix)?;
        Ok(defaults)
    }

    pub fn save(&self, prefix: &Path) -> Result<()> {
        let contents = format!(
            "[General]\nName={}\nDescription={}\n\n[Logging]\nEnabled={}\nDebugLevel={}\n",
            quote_ini(&self.name),
            quote_ini(&self.description),
            self.logging_enabled,
            self.debug_log_level,
        );
        std::fs::write(prefix.join(BOTTLE_CONFIG_FILE), contents)?;
        Ok(())
    }
}
