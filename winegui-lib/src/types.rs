//! Bottle setting types shared by the registry readers and winetricks setters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bottle architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bit {
    #[serde(rename = "win32")]
    Win32,
    #[serde(rename = "win64")]
    Win64,
}

impl Bit {
    /// Value used by `WINEARCH` and the `#arch` registry marker
    pub fn as_str(&self) -> &'static str {
        match self {
            Bit::Win32 => "win32",
            Bit::Win64 => "win64",
        }
    }

    /// Short display form ("32" / "64")
    pub fn bits(&self) -> &'static str {
        match self {
            Bit::Win32 => "32",
            Bit::Win64 => "64",
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl FromStr for Bit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "win32" | "32" => Ok(Bit::Win32),
            "win64" | "64" => Ok(Bit::Win64),
            _ => Err(format!("Unknown architecture: {}", s)),
        }
    }
}

/// Audio drivers Wine can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioDriver {
    #[default]
    #[serde(rename = "pulse")]
    PulseAudio,
    #[serde(rename = "alsa")]
    Alsa,
    #[serde(rename = "coreaudio")]
    CoreAudio,
    #[serde(rename = "oss")]
    Oss,
    #[serde(rename = "disabled")]
    Disabled,
}

impl AudioDriver {
    /// Registry value of `[Software\\Wine\\Drivers]` / `Audio`, also the
    /// winetricks `sound=` argument
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioDriver::PulseAudio => "pulse",
            AudioDriver::Alsa => "alsa",
            AudioDriver::CoreAudio => "coreaudio",
            AudioDriver::Oss => "oss",
            AudioDriver::Disabled => "disabled",
        }
    }

    /// Map a registry value, falling back to PulseAudio like Wine does
    pub fn from_registry(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for AudioDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioDriver::PulseAudio => "PulseAudio",
            AudioDriver::Alsa => "Advanced Linux Sound Architecture (ALSA)",
            AudioDriver::CoreAudio => "Core Audio",
            AudioDriver::Oss => "Open Sound System (OSS)",
            AudioDriver::Disabled => "Disabled",
        };
        f.write_str(name)
    }
}

impl FromStr for AudioDriver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pulse" => Ok(AudioDriver::PulseAudio),
            "alsa" => Ok(AudioDriver::Alsa),
            "coreaudio" => Ok(AudioDriver::CoreAudio),
            "oss" => Ok(AudioDriver::Oss),
            "disabled" => Ok(AudioDriver::Disabled),
            _ => Err(format!("Unknown audio driver: {}", s)),
        }
    }
}

/// DLL load order as stored under `[Software\\Wine\\DllOverrides]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DllLoadOrder {
    #[serde(rename = "builtin")]
    Builtin,
    #[default]
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "builtin,native")]
    BuiltinNative,
    #[serde(rename = "native,builtin")]
    NativeBuiltin,
    #[serde(rename = "")]
    Disabled,
}

impl DllLoadOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            DllLoadOrder::Builtin => "builtin",
            DllLoadOrder::Native => "native",
            DllLoadOrder::BuiltinNative => "builtin,native",
            DllLoadOrder::NativeBuiltin => "native,builtin",
            DllLoadOrder::Disabled => "",
        }
    }
}

impl fmt::Display for DllLoadOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DllLoadOrder::Disabled => f.write_str("disabled"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for DllLoadOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "builtin" | "b" => Ok(DllLoadOrder::Builtin),
            "native" | "n" => Ok(DllLoadOrder::Native),
            "builtin,native" | "b,n" => Ok(DllLoadOrder::BuiltinNative),
            "native,builtin" | "n,b" => Ok(DllLoadOrder::NativeBuiltin),
            "" | "disabled" => Ok(DllLoadOrder::Disabled),
            _ => Err(format!("Unknown DLL load order: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_driver_from_registry() {
        assert_eq!(AudioDriver::from_registry("alsa"), AudioDriver::Alsa);
        assert_eq!(AudioDriver::from_registry("disabled"), AudioDriver::Disabled);
        assert_eq!(AudioDriver::from_registry("jack"), AudioDriver::PulseAudio);
        assert_eq!(AudioDriver::from_registry(""), AudioDriver::PulseAudio);
    }

    #[test]
    fn test_bit_parsing() {
        assert_eq!("win64".parse::<Bit>(), Ok(Bit::Win64));
        assert_eq!("32".parse::<Bit>(), Ok(Bit::Win32));
        assert!("win16".parse::<Bit>().is_err());
        assert_eq!(Bit::Win64.to_string(), "64-bit");
    }

    #[test]
    fn test_dll_load_order_strings() {
        assert_eq!(DllLoadOrder::NativeBuiltin.as_str(), "native,builtin");
        assert_eq!(DllLoadOrder::Disabled.as_str(), "");
        assert_eq!("n,b".parse::<DllLoadOrder>(), Ok(DllLoadOrder::NativeBuiltin));
        assert_eq!(DllLoadOrder::default(), DllLoadOrder::Native);
    }
}
