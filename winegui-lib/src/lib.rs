//! WineGUI Library
//!
//! Reads the configuration of Wine bottles straight from the text registry
//! hives Wine keeps in every prefix, and wraps the few Wine and winetricks
//! commands needed to change it.

pub mod bottle;
pub mod discovery;
pub mod error;
pub mod escape;
pub mod registry;
pub mod settings;
pub mod types;
pub mod version;
pub mod wine;

pub use bottle::{BottleConfig, BottleConfigReader};
pub use discovery::list_bottle_paths;
pub use error::{Result, WineGuiError};
pub use settings::{BottleSettings, GeneralSettings};
pub use types::{AudioDriver, Bit, DllLoadOrder};
pub use version::{WindowsVersion, WindowsVersionEntry};
pub use wine::{CommandRunner, SystemRunner, WineBinaries, Winetricks};
