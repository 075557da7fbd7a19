//! Windows version table
//!
//! Converts the version values Wine stores in the registry into a
//! [`WindowsVersion`]. Rows are ordered newest to oldest and several rows may
//! map to the same version, so every lookup is a linear scan that returns the
//! first matching row.
//!
//! Source of the values: `programs/winecfg/appdefaults.c` in Wine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Windows versions Wine can emulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowsVersion {
    Windows20,
    Windows30,
    Windows31,
    WindowsNT351,
    WindowsNT40,
    Windows95,
    Windows98,
    WindowsME,
    Windows2000,
    WindowsXP,
    Windows2003,
    WindowsVista,
    Windows2008,
    Windows7,
    Windows2008R2,
    Windows8,
    Windows81,
    Windows10,
}

/// Windows version Wine uses when nothing else is configured
pub const DEFAULT_WINDOWS_VERSION: WindowsVersion = WindowsVersion::Windows7;

impl WindowsVersion {
    /// Argument accepted by winetricks to switch a bottle to this version
    pub fn winetricks_code(&self) -> &'static str {
        match self {
            WindowsVersion::Windows20 => "win20",
            WindowsVersion::Windows30 => "win30",
            WindowsVersion::Windows31 => "win31",
            WindowsVersion::WindowsNT351 => "nt351",
            WindowsVersion::WindowsNT40 => "nt40",
            WindowsVersion::Windows95 => "win95",
            WindowsVersion::Windows98 => "win98",
            WindowsVersion::WindowsME => "winme",
            WindowsVersion::Windows2000 => "win2k",
            WindowsVersion::WindowsXP => "winxp",
            WindowsVersion::Windows2003 => "win2k3",
            WindowsVersion::WindowsVista => "vista",
            WindowsVersion::Windows2008 => "win2k8",
            WindowsVersion::Windows7 => "win7",
            WindowsVersion::Windows2008R2 => "win2k8r2",
            WindowsVersion::Windows8 => "win8",
            WindowsVersion::Windows81 => "win81",
            WindowsVersion::Windows10 => "win10",
        }
    }
}

impl fmt::Display for WindowsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowsVersion::Windows20 => "Windows 2.0",
            WindowsVersion::Windows30 => "Windows 3.0",
            WindowsVersion::Windows31 => "Windows 3.1",
            WindowsVersion::WindowsNT351 => "Windows NT 3.51",
            WindowsVersion::WindowsNT40 => "Windows NT 4.0",
            WindowsVersion::Windows95 => "Windows 95",
            WindowsVersion::Windows98 => "Windows 98",
            WindowsVersion::WindowsME => "Windows ME",
            WindowsVersion::Windows2000 => "Windows 2000",
            WindowsVersion::WindowsXP => "Windows XP",
            WindowsVersion::Windows2003 => "Windows 2003",
            WindowsVersion::WindowsVista => "Windows Vista",
            WindowsVersion::Windows2008 => "Windows 2008",
            WindowsVersion::Windows7 => "Windows 7",
            WindowsVersion::Windows2008R2 => "Windows 2008 R2",
            WindowsVersion::Windows8 => "Windows 8",
            WindowsVersion::Windows81 => "Windows 8.1",
            WindowsVersion::Windows10 => "Windows 10",
        };
        f.write_str(name)
    }
}

/// One row of the version table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsVersionEntry {
    pub windows: WindowsVersion,

    /// Short code stored in `user.reg` (`[Software\\Wine]` / `Version`)
    pub code: &'static str,

    /// `CurrentVersion` (NT) or major.minor of `VersionNumber` (9x)
    pub version_number: &'static str,

    pub build_number: &'static str,

    /// `WinNT`, `ServerNT`, or empty for the 9x line
    pub product_type: &'static str,
}

const fn entry(
    windows: WindowsVersion,
    code: &'static str,
    version_number: &'static str,
    build_number: &'static str,
    product_type: &'static str,
) -> WindowsVersionEntry {
    WindowsVersionEntry {
        windows,
        code,
        version_number,
        build_number,
        product_type,
    }
}

/// Version table, newest first. Order is the tie-break between rows.
pub static WINDOWS_VERSIONS: &[WindowsVersionEntry] = &[
    entry(WindowsVersion::Windows10, "win10", "10.0", "18362", "WinNT"),
    entry(WindowsVersion::Windows81, "win81", "6.3", "9600", "WinNT"),
    entry(WindowsVersion::Windows8, "win8", "6.2", "9200", "WinNT"),
    entry(WindowsVersion::Windows2008R2, "win2008r2", "6.1", "7601", "ServerNT"),
    entry(WindowsVersion::Windows7, "win7", "6.1", "7601", "WinNT"),
    entry(WindowsVersion::Windows2008, "win2008", "6.0", "6002", "ServerNT"),
    entry(WindowsVersion::WindowsVista, "vista", "6.0", "6002", "WinNT"),
    entry(WindowsVersion::Windows2003, "win2003", "5.2", "3790", "ServerNT"),
    // 64-bit
    entry(WindowsVersion::WindowsXP, "winxp64", "5.2", "3790", "WinNT"),
    // 32-bit
    entry(WindowsVersion::WindowsXP, "winxp", "5.1", "2600", "WinNT"),
    entry(WindowsVersion::Windows2000, "win2k", "5.0", "2195", "WinNT"),
    entry(WindowsVersion::WindowsME, "winme", "4.90", "3000", ""),
    entry(WindowsVersion::Windows98, "win98", "4.10", "2222", ""),
    entry(WindowsVersion::Windows95, "win95", "4.0", "950", ""),
    entry(WindowsVersion::WindowsNT40, "nt40", "4.0", "1381", "WinNT"),
    entry(WindowsVersion::WindowsNT351, "nt351", "3.51", "1057", "WinNT"),
    entry(WindowsVersion::Windows31, "win31", "3.10", "0", ""),
    entry(WindowsVersion::Windows30, "win30", "3.0", "0", ""),
    entry(WindowsVersion::Windows20, "win20", "2.0", "0", ""),
];

/// Look up the short code Wine writes to `user.reg` (e.g. `win10`)
pub fn match_by_code(code: &str) -> Option<&'static WindowsVersionEntry> {
    WINDOWS_VERSIONS.iter().find(|e| e.code == code)
}

/// Match a Windows 9x style version (version + build number only)
pub fn match_9x(version_number: &str, build_number: &str) -> Option<&'static WindowsVersionEntry> {
    WINDOWS_VERSIONS
        .iter()
        .find(|e| e.version_number == version_number && e.build_number == build_number)
}

/// Match an NT style version
///
/// An exact version + build match is preferred; otherwise the first row with
/// the same version number wins. In both passes an empty `product_type`
/// matches any row, a non-empty one must be equal.
pub fn match_nt(
    version_number: &str,
    build_number: &str,
    product_type: &str,
) -> Option<&'static WindowsVersionEntry> {
    let product_matches =
        |e: &WindowsVersionEntry| product_type.is_empty() || e.product_type == product_type;

    WINDOWS_VERSIONS
        .iter()
        .find(|e| {
            e.version_number == version_number
                && e.build_number == build_number
                && product_matches(e)
        })
        .or_else(|| {
            WINDOWS_VERSIONS
                .iter()
                .find(|e| e.version_number == version_number && product_matches(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_type_disambiguates() {
        let win7 = match_nt("6.1", "7601", "WinNT").unwrap();
        assert_eq!(win7.windows, WindowsVersion::Windows7);

        let server = match_nt("6.1", "7601", "ServerNT").unwrap();
        assert_eq!(server.windows, WindowsVersion::Windows2008R2);
    }

    #[test]
    fn test_unknown_build_falls_back_to_version() {
        let entry = match_nt("6.1", "9999", "WinNT").unwrap();
        assert_eq!(entry.windows, WindowsVersion::Windows7);
    }

    #[test]
    fn test_fallback_honors_table_order() {
        // Without a product type the first "6.1" row wins
        let entry = match_nt("6.1", "9999", "").unwrap();
        assert_eq!(entry.windows, WindowsVersion::Windows2008R2);

        let entry = match_nt("6.1", "7601", "").unwrap();
        assert_eq!(entry.windows, WindowsVersion::Windows2008R2);
    }

    #[test]
    fn test_nt_no_match() {
        assert!(match_nt("11.0", "22000", "WinNT").is_none());
        assert!(match_nt("4.90", "3000", "WinNT").is_none());
    }

    #[test]
    fn test_xp_rows_share_version() {
        assert_eq!(match_by_code("winxp64").unwrap().windows, WindowsVersion::WindowsXP);
        assert_eq!(match_by_code("winxp").unwrap().windows, WindowsVersion::WindowsXP);
        assert_eq!(
            match_nt("5.2", "3790", "WinNT").unwrap().code,
            "winxp64"
        );
        assert_eq!(
            match_nt("5.2", "3790", "ServerNT").unwrap().windows,
            WindowsVersion::Windows2003
        );
    }

    #[test]
    fn test_match_9x() {
        assert_eq!(match_9x("4.10", "2222").unwrap().windows, WindowsVersion::Windows98);
        assert_eq!(match_9x("4.0", "950").unwrap().windows, WindowsVersion::Windows95);
        assert!(match_9x("4.10", "1998").is_none());
    }

    #[test]
    fn test_match_by_code_unknown() {
        assert!(match_by_code("win11").is_none());
        assert!(match_by_code("").is_none());
    }
}
