//! Reader for Wine's text registry hives (`system.reg`, `user.reg`, `userdef.reg`)
//!
//! A hive is a sequence of sections. Each section starts with a bracketed key
//! header (backslashes doubled, optionally followed by a timestamp) and runs
//! until the next blank line:
//!
//! ```text
//! [Software\\Wine\\Explorer] 1652031823
//! #time=1d862c6a4b9f8b4
//! "Desktop"="Default"
//! ```
//!
//! Nothing is cached: every query opens the file and scans it from the top.

use crate::error::{Result, WineGuiError};
use crate::escape;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

/// Build a section header from logical key segments.
///
/// `section_key(&["Software", "Wine"])` gives `[Software\\Wine]`.
pub fn section_key(segments: &[&str]) -> String {
    format!("{}]", key_prefix(segments))
}

/// Like [`section_key`] but without the closing bracket, so it also matches
/// keys that merely start with the given path.
pub fn key_prefix(segments: &[&str]) -> String {
    format!("[{}", segments.join("\\\\"))
}

/// The lines of one registry section, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySection {
    /// The header line that matched
    pub header: String,

    /// Raw lines following the header up to the next blank line or EOF
    pub lines: Vec<String>,
}

impl RegistrySection {
    /// Data of `"<value_name>"=...`, quotes removed
    pub fn value(&self, value_name: &str) -> Option<String> {
        let pattern = format!("\"{}\"=", value_name);
        self.lines.iter().find_map(|line| {
            line.find(&pattern)
                .map(|pos| strip_quotes(&line[pos + pattern.len()..]))
        })
    }

    /// Non-comment lines of the section, verbatim
    pub fn subkeys(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|line| !line.starts_with('#'))
            .cloned()
            .collect()
    }

    /// Unescaped data (after the first `=`) of every line that contains
    /// `value_filter` and does not contain `ignore_filter`. Empty filters are
    /// disabled.
    pub fn subkey_values(&self, value_filter: &str, ignore_filter: &str) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| escape::decode(line))
            .filter(|line| !line.starts_with('#'))
            .filter(|line| value_filter.is_empty() || line.contains(value_filter))
            .filter(|line| ignore_filter.is_empty() || !line.contains(ignore_filter))
            .filter_map(|line| line.split_once('=').map(|(_, data)| strip_quotes(data)))
            .collect()
    }
}

/// Open a hive and iterate over its lines.
///
/// Lines are decoded lossily and a trailing `\r` is dropped.
fn hive_lines(file_path: &Path) -> Result<impl Iterator<Item = Result<String>>> {
    let file = File::open(file_path).map_err(|e| WineGuiError::file_open(file_path, e))?;
    let reader = BufReader::new(file);

    Ok(reader.split(b'\n').map(|line| {
        let bytes = line?;
        let mut line = String::from_utf8_lossy(&bytes).into_owned();
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }))
}

fn strip_quotes(data: &str) -> String {
    data.chars().filter(|&c| c != '"').collect()
}

/// Scan `file_path` for the first section whose header starts with `key`.
///
/// Returns `None` when no header matches.
pub fn read_section(file_path: impl AsRef<Path>, key: &str) -> Result<Option<RegistrySection>> {
    let file_path = file_path.as_ref();
    let mut section: Option<RegistrySection> = None;

    for line in hive_lines(file_path)? {
        let line = line?;
        match section.as_mut() {
            None => {
                if line.starts_with(key) {
                    trace!("Matched section {} in {:?}", key, file_path);
                    section = Some(RegistrySection {
                        header: line,
                        lines: Vec::new(),
                    });
                }
            }
            Some(current) => {
                if line.is_empty() {
                    break;
                }
                current.lines.push(line);
            }
        }
    }

    if section.is_none() {
        debug!("Section {} not found in {:?}", key, file_path);
    }
    Ok(section)
}

/// Read a single value. Empty when the section or value is absent.
pub fn read_value(file_path: impl AsRef<Path>, key: &str, value_name: &str) -> Result<String> {
    let value = read_section(file_path, key)?
        .and_then(|section| section.value(value_name))
        .unwrap_or_default();
    Ok(value)
}

/// Read the raw, non-comment lines of a section
pub fn read_subkeys(file_path: impl AsRef<Path>, key: &str) -> Result<Vec<String>> {
    Ok(read_section(file_path, key)?
        .map(|section| section.subkeys())
        .unwrap_or_default())
}

/// Read the unescaped value data of a section, filtered (see
/// [`RegistrySection::subkey_values`])
pub fn read_subkey_values(
    file_path: impl AsRef<Path>,
    key: &str,
    value_filter: &str,
    ignore_filter: &str,
) -> Result<Vec<String>> {
    Ok(read_section(file_path, key)?
        .map(|section| section.subkey_values(value_filter, ignore_filter))
        .unwrap_or_default())
}

/// Read a `#<meta_name>=` marker anywhere in the hive (e.g. `#arch=win64`)
pub fn read_meta(file_path: impl AsRef<Path>, meta_name: &str) -> Result<String> {
    let pattern = format!("#{}=", meta_name);
    for line in hive_lines(file_path.as_ref())? {
        let line = line?;
        if let Some(pos) = line.find(&pattern) {
            return Ok(strip_quotes(&line[pos + pattern.len()..]));
        }
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const USER_REG: &str = r#"WINE REGISTRY Version 2
;; All keys relative to \\User\\S-1-5-21-0-0-0-1000

#arch=win64

[Software\\Wine] 1652031823
#time=1d862c6a4b9f8b4
"Version"="win10"

[Software\\Wine\\Drivers] 1652031823
#time=1d862c6a4ba2e2e
"Audio"="alsa"

[Software\\Wine\\MenuFiles] 1652031900
#time=1d862c6d3b9e1a4
"/home/user/.local/share/applications/wine/Programs/Notepad++.desktop"="C:\\users\\Public\\Start Menu\\Programs\\Notepad++.lnk"
"/home/user/.config/menus/applications-merged/wine-Programs.menu"="C:\\users\\Public\\Start Menu\\Programs"
"/home/user/.local/share/applications/wine/Programs/Caf\xe9.desktop"="C:\\users\\Public\\Start Menu\\Programs\\Caf\xe9.lnk"
"/home/user/Desktop/Other.desktop"="C:\\users\\Public\\Desktop\\Other.lnk"

[Software\\Wine\\Explorer]
"Desktop"="Default"
"#;

    fn hive(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_section_key() {
        assert_eq!(section_key(&["Software", "Wine"]), r"[Software\\Wine]");
        assert_eq!(
            key_prefix(&["Software", "Microsoft", "Windows"]),
            r"[Software\\Microsoft\\Windows"
        );
    }

    #[test]
    fn test_read_value() {
        let file = hive(USER_REG);
        let value = read_value(file.path(), r"[Software\\Wine]", "Version").unwrap();
        assert_eq!(value, "win10");
    }

    #[test]
    fn test_read_value_missing_section_is_empty() {
        let file = hive(USER_REG);
        let value = read_value(file.path(), r"[Software\\Wine\\Direct3D]", "renderer").unwrap();
        assert_eq!(value, "");
    }

    #[test]
    fn test_read_value_does_not_leak_into_next_section() {
        let file = hive(USER_REG);
        // "Audio" only exists in the Drivers section, after a blank line
        let value = read_value(file.path(), r"[Software\\Wine]", "Audio").unwrap();
        assert_eq!(value, "");
    }

    #[test]
    fn test_read_value_last_section_without_trailing_newline() {
        let file = hive("[Software\\\\Wine\\\\Explorer]\n\"Desktop\"=\"Default\"");
        let value = read_value(file.path(), r"[Software\\Wine\\Explorer]", "Desktop").unwrap();
        assert_eq!(value, "Default");
    }

    #[test]
    fn test_read_value_crlf() {
        let file = hive("[Software\\\\Wine]\r\n\"Version\"=\"win7\"\r\n\r\n");
        let value = read_value(file.path(), r"[Software\\Wine]", "Version").unwrap();
        assert_eq!(value, "win7");
    }

    #[test]
    fn test_read_subkeys_skips_comments_and_stops_at_blank_line() {
        let file = hive(USER_REG);
        let keys = read_subkeys(file.path(), r"[Software\\Wine\\Drivers]").unwrap();
        assert_eq!(keys, vec![r#""Audio"="alsa""#.to_string()]);
    }

    #[test]
    fn test_read_subkey_values_filters() {
        let file = hive(USER_REG);
        let items = read_subkey_values(
            file.path(),
            r"[Software\\Wine\\MenuFiles]",
            "Start Menu",
            "applications-merged",
        )
        .unwrap();
        assert_eq!(
            items,
            vec![
                r"C:\users\Public\Start Menu\Programs\Notepad++.lnk".to_string(),
                r"C:\users\Public\Start Menu\Programs\Café.lnk".to_string(),
            ]
        );
    }

    #[test]
    fn test_read_subkey_values_unfiltered() {
        let file = hive(USER_REG);
        let items = read_subkey_values(file.path(), r"[Software\\Wine\\MenuFiles]", "", "").unwrap();
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn test_read_meta() {
        let file = hive(USER_REG);
        assert_eq!(read_meta(file.path(), "arch").unwrap(), "win64");
        assert_eq!(read_meta(file.path(), "nothing").unwrap(), "");
    }

    #[test]
    fn test_missing_file_is_file_open_error() {
        let err = read_value("/nonexistent/user.reg", r"[Software\\Wine]", "Version").unwrap_err();
        assert!(matches!(err, WineGuiError::FileOpen { .. }));
    }
}
