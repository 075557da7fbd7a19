//! Typed configuration queries about a single bottle (Wine prefix)
//!
//! Every query reads the hive files again, so results always reflect what is
//! on disk at the time of the call.

use crate::discovery;
use crate::error::{Result, WineGuiError};
use crate::registry::{self, key_prefix, section_key};
use crate::settings::BottleSettings;
use crate::types::{AudioDriver, Bit, DllLoadOrder};
use crate::version::{self, WindowsVersion, DEFAULT_WINDOWS_VERSION};
use chrono::{Local, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SYSTEM_REG: &str = "system.reg";
pub const USER_REG: &str = "user.reg";
pub const UPDATE_TIMESTAMP: &str = ".update-timestamp";

const KEY_9X: &str = r"[Software\\Microsoft\\Windows\\CurrentVersion]";
const KEY_NT: &str = r"[Software\\Microsoft\\Windows NT\\CurrentVersion]";
const KEY_PRODUCT_OPTIONS: &str = r"[System\\CurrentControlSet\\Control\\ProductOptions]";
const KEY_WINE: &str = r"[Software\\Wine]";
const KEY_AUDIO: &str = r"[Software\\Wine\\Drivers]";
const KEY_VIRTUAL_DESKTOP: &str = r"[Software\\Wine\\Explorer]";
const KEY_VIRTUAL_DESKTOP_RESOLUTION: &str = r"[Software\\Wine\\Explorer\\Desktops]";
const KEY_DLL_OVERRIDES: &str = r"[Software\\Wine\\DllOverrides]";
const KEY_MENU_FILES: &str = r"[Software\\Wine\\MenuFiles]";

const NAME_NT_VERSION: &str = "CurrentVersion";
const NAME_NT_BUILD_NUMBER: &str = "CurrentBuildNumber";
const NAME_9X_VERSION: &str = "VersionNumber";
const NAME_PRODUCT_TYPE: &str = "ProductType";
const NAME_WINDOWS_VERSION: &str = "Version";
const NAME_AUDIO: &str = "Audio";
const NAME_VIRTUAL_DESKTOP: &str = "Desktop";
const NAME_VIRTUAL_DESKTOP_DEFAULT: &str = "Default";

/// Snapshot of a bottle's configuration
#[derive(Debug, Clone, Serialize)]
pub struct BottleConfig {
    pub name: String,
    pub prefix: PathBuf,
    pub description: String,
    pub windows: WindowsVersion,
    pub bit: Bit,
    pub audio_driver: AudioDriver,

    /// Virtual desktop resolution, `None` when disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_desktop: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_drive: Option<PathBuf>,

    pub menu_items: Vec<String>,

    /// `true` when the prefix looks like a working bottle
    pub status: bool,
}

/// Reads configuration facets of the bottle rooted at `prefix`
#[derive(Debug, Clone)]
pub struct BottleConfigReader {
    prefix: PathBuf,
}

impl BottleConfigReader {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Display name derived from the prefix directory
    pub fn name(&self) -> String {
        discovery::folder_name(&self.prefix)
    }

    fn user_reg(&self) -> PathBuf {
        self.prefix.join(USER_REG)
    }

    fn system_reg(&self) -> PathBuf {
        self.prefix.join(SYSTEM_REG)
    }

    fn config_error(&self, what: &str) -> WineGuiError {
        WineGuiError::Config(format!(
            "{}, for Wine machine: {} (full location: {})",
            what,
            self.name(),
            self.prefix.display()
        ))
    }

    /// Emulated Windows version
    ///
    /// Tries the short code in `user.reg` first, then the NT version keys and
    /// finally the 9x version key of `system.reg`.
    pub fn windows_version(&self) -> Result<WindowsVersion> {
        let code = registry::read_value(self.user_reg(), KEY_WINE, NAME_WINDOWS_VERSION)?;
        if !code.is_empty() {
            match version::match_by_code(&code) {
                Some(entry) => return Ok(entry.windows),
                None => debug!("Unknown Windows version code '{}' in {:?}", code, self.user_reg()),
            }
        }

        let system_reg = self.system_reg();
        let nt_version = registry::read_value(&system_reg, KEY_NT, NAME_NT_VERSION)?;
        if !nt_version.is_empty() {
            let build = registry::read_value(&system_reg, KEY_NT, NAME_NT_BUILD_NUMBER)?;
            let product_type =
                registry::read_value(&system_reg, KEY_PRODUCT_OPTIONS, NAME_PRODUCT_TYPE)?;
            return version::match_nt(&nt_version, &build, &product_type)
                .map(|entry| entry.windows)
                .ok_or_else(|| {
                    self.config_error(&format!(
                        "Could not determine Windows version (NT {} build {})",
                        nt_version, build
                    ))
                });
        }

        let version_9x = registry::read_value(&system_reg, KEY_9X, NAME_9X_VERSION)?;
        if !version_9x.is_empty() {
            return Ok(windows_from_9x(&version_9x));
        }

        Err(self.config_error(&format!(
            "Could not determine Windows version, we assume {}",
            DEFAULT_WINDOWS_VERSION
        )))
    }

    /// Bottle architecture from the `#arch` marker in `user.reg`
    pub fn bitness(&self) -> Result<Bit> {
        let value = registry::read_meta(self.user_reg(), "arch")?;
        match value.as_str() {
            "win32" => Ok(Bit::Win32),
            "win64" => Ok(Bit::Win64),
            "" => Err(self.config_error("Could not determine Windows system bit")),
            other => Err(self.config_error(&format!(
                "Could not determine Windows system bit (not win32 and not win64, value: {})",
                other
            ))),
        }
    }

    /// Configured audio driver, PulseAudio when unset or unknown
    pub fn audio_driver(&self) -> Result<AudioDriver> {
        let value = registry::read_value(self.user_reg(), KEY_AUDIO, NAME_AUDIO)?;
        Ok(AudioDriver::from_registry(&value))
    }

    /// Virtual desktop resolution (e.g. `1024x768`), empty when disabled
    pub fn virtual_desktop(&self) -> Result<String> {
        let user_reg = self.user_reg();
        let desktop = registry::read_value(&user_reg, KEY_VIRTUAL_DESKTOP, NAME_VIRTUAL_DESKTOP)?;
        if desktop.is_empty() {
            return Ok(String::new());
        }
        registry::read_value(
            &user_reg,
            KEY_VIRTUAL_DESKTOP_RESOLUTION,
            NAME_VIRTUAL_DESKTOP_DEFAULT,
        )
    }

    /// Local date/time of the last Wine update of this prefix
    pub fn last_update(&self) -> Result<String> {
        let file_path = self.prefix.join(UPDATE_TIMESTAMP);
        let contents = match std::fs::read(&file_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.config_error("Could not determine last wine update timestamp"));
            }
            Err(e) => return Err(WineGuiError::file_open(file_path, e)),
        };

        let epoch: String = contents.chars().filter(|&c| c != '\n').collect();
        let seconds = epoch
            .trim()
            .parse::<i64>()
            .map_err(|_| self.config_error("Could not determine last wine update timestamp"))?;

        Local
            .timestamp_opt(seconds, 0)
            .single()
            .map(|time| time.format("%c").to_string())
            .ok_or_else(|| self.config_error("Wine update timestamp is out of range"))
    }

    /// Start menu shortcuts (`.lnk` paths) Wine created for this bottle
    pub fn menu_items(&self) -> Result<Vec<String>> {
        registry::read_subkey_values(
            self.user_reg(),
            KEY_MENU_FILES,
            "Start Menu",
            "applications-merged",
        )
    }

    /// Whether `dll_name` is overridden with exactly `load_order`
    pub fn dll_override(&self, dll_name: &str, load_order: DllLoadOrder) -> Result<bool> {
        let value = registry::read_value(self.user_reg(), KEY_DLL_OVERRIDES, dll_name)?;
        Ok(value == load_order.as_str())
    }

    /// Display name of an installed program, by GUID or uninstall key name.
    /// Empty when not installed.
    pub fn uninstaller(&self, uninstaller_key: &str) -> Result<String> {
        let key = key_prefix(&[
            "Software",
            "Microsoft",
            "Windows",
            "CurrentVersion",
            "Uninstall",
            uninstaller_key,
        ]);
        registry::read_value(self.system_reg(), &key, "DisplayName")
    }

    /// File name registered for `font_name` (e.g. `Arial (TrueType)`).
    /// Empty when the font is not installed.
    pub fn font_filename(&self, bit: Bit, font_name: &str) -> Result<String> {
        let key = match bit {
            Bit::Win32 => section_key(&["Software", "Microsoft", "Windows", "CurrentVersion", "Fonts"]),
            Bit::Win64 => section_key(&[
                "Software",
                "Wow6432Node",
                "Microsoft",
                "Windows",
                "CurrentVersion",
                "Fonts",
            ]),
        };
        registry::read_value(self.system_reg(), &key, font_name)
    }

    /// Location of the C: drive
    pub fn c_drive(&self) -> Result<PathBuf> {
        let c_drive = self.prefix.join("dosdevices").join("c:");
        if self.prefix.is_dir() && c_drive.is_dir() {
            Ok(c_drive)
        } else {
            Err(self.config_error("Could not determine C:\\ drive location"))
        }
    }

    /// Minimal health check of the prefix. Never fails.
    pub fn status(&self) -> bool {
        if !self.prefix.is_dir()
            || !self.prefix.join("dosdevices").is_dir()
            || !self.system_reg().is_file()
        {
            debug!("Bottle {:?} is missing dosdevices or {}", self.prefix, SYSTEM_REG);
            return false;
        }

        match self.windows_version() {
            Ok(_) => true,
            Err(e) => {
                debug!("Bottle {:?} is not healthy: {}", self.prefix, e);
                false
            }
        }
    }

    /// Read every facet into a [`BottleConfig`]
    ///
    /// Windows version and bitness are required; the remaining facets fall
    /// back to their defaults.
    pub fn read_config(&self) -> Result<BottleConfig> {
        let windows = self.windows_version()?;
        let bit = self.bitness()?;
        let settings = BottleSettings::read(&self.prefix);

        let last_update = match self.last_update() {
            Ok(time) => Some(time),
            Err(e) => {
                debug!("{}", e);
                None
            }
        };
        let virtual_desktop = Some(self.virtual_desktop()?).filter(|res| !res.is_empty());

        Ok(BottleConfig {
            name: settings.name,
            prefix: self.prefix.clone(),
            description: settings.description,
            windows,
            bit,
            audio_driver: self.audio_driver()?,
            virtual_desktop,
            last_update,
            c_drive: self.c_drive().ok(),
            menu_items: self.menu_items()?,
            status: self.status(),
        })
    }
}

/// Map a 9x `VersionNumber` (`major.minor.build`) to a Windows version,
/// falling back to the Wine default
fn windows_from_9x(version_number: &str) -> WindowsVersion {
    let parts: Vec<&str> = version_number.split('.').collect();
    let version = if parts.len() >= 2 {
        format!("{}.{}", parts[0], parts[1])
    } else {
        String::new()
    };
    let build = parts.get(2).copied().unwrap_or_default();

    match version::match_9x(&version, build) {
        Some(entry) => entry.windows,
        None => {
            warn!(
                "Unknown 9x version '{}', assuming {}",
                version_number, DEFAULT_WINDOWS_VERSION
            );
            DEFAULT_WINDOWS_VERSION
        }
    }
}

/// Icon of a start menu shortcut, resolved through the `.desktop` file Wine
/// generated under the user's data directory
pub fn program_icon_path(shortcut_path: &str) -> Result<Option<PathBuf>> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| WineGuiError::Config("Could not determine data directory".into()))?;
    program_icon_path_in(&data_dir, shortcut_path)
}

/// [`program_icon_path`] with an explicit data directory (`~/.local/share`)
///
/// Returns `None` when the desktop file has no `Icon=` entry.
pub fn program_icon_path_in(data_dir: &Path, shortcut_path: &str) -> Result<Option<PathBuf>> {
    const START_MENU: &str = "Start Menu";

    let pos = shortcut_path.find(START_MENU).ok_or_else(|| {
        WineGuiError::Config(format!(
            "Application menu item is not part of the start menu: {}",
            shortcut_path
        ))
    })?;
    let relative = shortcut_path[pos + START_MENU.len()..]
        .trim_start_matches('\\')
        .replace('\\', "/");

    let shortcut = data_dir.join("applications").join("wine").join(relative);
    if shortcut.extension().is_none() {
        return Err(WineGuiError::Config(format!(
            "Could not find extension in application menu item: {}",
            shortcut_path
        )));
    }

    let desktop_file = shortcut.with_extension("desktop");
    let contents = std::fs::read_to_string(&desktop_file)
        .map_err(|e| WineGuiError::file_open(&desktop_file, e))?;

    Ok(contents
        .lines()
        .find_map(|line| line.strip_prefix("Icon="))
        .map(|icon| {
            data_dir
                .join("icons/hicolor/32x32/apps")
                .join(format!("{}.png", icon.trim()))
        }))
}
