//! Wine interface: binary detection, winetricks setters and process helpers

use crate::error::{Result, WineGuiError};
use crate::settings;
use crate::types::AudioDriver;
use crate::version::WindowsVersion;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use which::which;

/// Default upper bound for [`wait_for_wineserver`]
pub const WINESERVER_TIMEOUT: Duration = Duration::from_secs(60);

const MIN_DESKTOP_WIDTH: u32 = 640;
const MIN_DESKTOP_HEIGHT: u32 = 480;

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,

    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs and waits for them to finish
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<CommandOutput> {
        debug!("Running {:?} {:?}", program, args);
        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .output()
            .map_err(|e| WineGuiError::CommandExecution {
                command: format!("{:?} {:?}", program, args),
                error: e.to_string(),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| WineGuiError::Config(format!("Invalid pattern {}: {}", re, e)))
}

fn prefix_env(prefix: &Path) -> String {
    prefix.to_string_lossy().into_owned()
}

/// Located Wine binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WineBinaries {
    /// `wine` or `wine64`
    pub wine: PathBuf,
    pub wineserver: PathBuf,
}

impl WineBinaries {
    /// Find Wine on `PATH`. With `prefer_wine64` the `wine64` binary is used
    /// when it exists.
    pub fn detect(prefer_wine64: bool) -> Result<Self> {
        let wine = if prefer_wine64 {
            which("wine64").or_else(|_| which("wine"))
        } else {
            which("wine")
        }
        .map_err(|_| WineGuiError::Wine("wine binary not found in PATH".into()))?;

        let wineserver = which("wineserver")
            .map_err(|_| WineGuiError::Wine("wineserver binary not found in PATH".into()))?;

        Ok(Self { wine, wineserver })
    }

    /// Wine version number, e.g. `8.0`
    pub fn version(&self, runner: &dyn CommandRunner) -> Result<String> {
        let output = runner.run(&self.wine, &["--version"], &[])?;
        parse_wine_version(&output.stdout)
    }
}

/// Extract the version number from `wine --version` output
/// (`wine-8.0 (Staging)` becomes `8.0`)
pub fn parse_wine_version(output: &str) -> Result<String> {
    let output = output.trim();
    if output.is_empty() {
        return Err(WineGuiError::Config("wine --version returned empty".into()));
    }
    let (_, rest) = output.split_once('-').ok_or_else(|| {
        WineGuiError::Config(format!("Could not determine Wine version from: {}", output))
    })?;
    Ok(rest.split_whitespace().next().unwrap_or_default().to_string())
}

/// `WINEDEBUG` value for a bottle debug log level (0 to 9)
pub fn winedebug_for_level(level: i32) -> Option<&'static str> {
    let value = match level {
        0 => "-all",
        1 => "",
        2 => "fixme-all",
        3 => "warn+all",
        4 => "+fps",
        5 => "-d3d",
        6 => "+relay,+heap",
        7 => "+relay,+msgbox",
        8 => "+all,-relay",
        9 => "+all",
        _ => return None,
    };
    Some(value)
}

/// GUID of an installed application as listed by `wine uninstaller --list`.
/// Empty when the application is not listed.
pub fn find_uninstaller_guid(
    runner: &dyn CommandRunner,
    wine: &Path,
    prefix: &Path,
    application_name: &str,
) -> Result<String> {
    let prefix = prefix_env(prefix);
    let output = runner.run(wine, &["uninstaller", "--list"], &[("WINEPREFIX", &prefix)])?;
    let guid = pattern(r"\{([^}]*)\}")?;

    Ok(output
        .stdout
        .lines()
        .find(|line| line.contains(application_name))
        .and_then(|line| guid.captures(line))
        .map(|caps| caps[1].to_string())
        .unwrap_or_default())
}

/// The winetricks script WineGUI keeps in `~/.winegui/winetricks`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winetricks {
    script: PathBuf,
}

impl Winetricks {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// The script in the WineGUI directory, `None` when it is not installed
    pub fn locate() -> Result<Option<Self>> {
        let script = settings::winegui_dir()?.join("winetricks");
        if script.is_file() {
            Ok(Some(Self::new(script)))
        } else {
            debug!("Could not find winetricks at {:?}", script);
            Ok(None)
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Release date of the script (`YYYYMMDD`), empty when unknown
    pub fn version(&self, runner: &dyn CommandRunner) -> Result<String> {
        let output = runner.run(&self.script, &["--version"], &[])?;
        Ok(output.stdout.get(..8).unwrap_or_default().to_string())
    }

    fn run_verb(&self, runner: &dyn CommandRunner, prefix: &Path, verb: &str) -> Result<()> {
        let prefix = prefix_env(prefix);
        info!("Running winetricks {} for {}", verb, prefix);
        let output = runner.run(&self.script, &[verb], &[("WINEPREFIX", &prefix)])?;
        if !output.success() {
            return Err(WineGuiError::CommandExecution {
                command: format!("{} {}", self.script.display(), verb),
                error: match output.status {
                    Some(code) => format!("exited with status {}", code),
                    None => "terminated by signal".to_string(),
                },
            });
        }
        Ok(())
    }

    pub fn set_windows_version(
        &self,
        runner: &dyn CommandRunner,
        prefix: &Path,
        windows: WindowsVersion,
    ) -> Result<()> {
        self.run_verb(runner, prefix, windows.winetricks_code())
    }

    /// Enable a virtual desktop with a `WxH` resolution. Anything smaller
    /// than 640x480 is raised to 640x480.
    pub fn set_virtual_desktop(
        &self,
        runner: &dyn CommandRunner,
        prefix: &Path,
        resolution: &str,
    ) -> Result<()> {
        let invalid = || {
            WineGuiError::Config(format!(
                "Could not set virtual desktop resolution (invalid input): {}",
                resolution
            ))
        };
        let caps = pattern(r"^(\d+)x(\d+)$")?
            .captures(resolution.trim())
            .ok_or_else(invalid)?;
        let width: u32 = caps[1].parse().map_err(|_| invalid())?;
        let height: u32 = caps[2].parse().map_err(|_| invalid())?;

        let resolution = if width < MIN_DESKTOP_WIDTH || height < MIN_DESKTOP_HEIGHT {
            warn!(
                "Resolution {}x{} is below the minimum, using {}x{}",
                width, height, MIN_DESKTOP_WIDTH, MIN_DESKTOP_HEIGHT
            );
            format!("{}x{}", MIN_DESKTOP_WIDTH, MIN_DESKTOP_HEIGHT)
        } else {
            format!("{}x{}", width, height)
        };

        self.run_verb(runner, prefix, &format!("vd={}", resolution))
    }

    pub fn disable_virtual_desktop(&self, runner: &dyn CommandRunner, prefix: &Path) -> Result<()> {
        self.run_verb(runner, prefix, "vd=off")
    }

    pub fn set_audio_driver(
        &self,
        runner: &dyn CommandRunner,
        prefix: &Path,
        audio_driver: AudioDriver,
    ) -> Result<()> {
        self.run_verb(runner, prefix, &format!("sound={}", audio_driver.as_str()))
    }
}

/// Block until the wineserver of `prefix` exits (`wineserver -w`).
///
/// Returns `false` when `timeout` elapsed first; the waiting process is
/// killed in that case.
pub fn wait_for_wineserver(wineserver: &Path, prefix: &Path, timeout: Duration) -> Result<bool> {
    let command = format!("{:?} -w", wineserver);
    let mut child = Command::new(wineserver)
        .arg("-w")
        .env("WINEPREFIX", prefix)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| WineGuiError::CommandExecution {
            command: command.clone(),
            error: e.to_string(),
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            debug!("wineserver for {:?} terminated ({})", prefix, status);
            return Ok(true);
        }
        if Instant::now() >= deadline {
            warn!("Time-out of wineserver wait command triggered (wineserver is still running)");
            if let Err(e) = child.kill() {
                warn!("Could not stop {}: {}", command, e);
            }
            let _ = child.wait();
            return Ok(false);
        }
        thread::sleep(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records invocations and answers with a fixed output
    struct MockRunner {
        output: CommandOutput,
        calls: Mutex<Vec<(PathBuf, Vec<String>, Vec<(String, String)>)>>,
    }

    impl MockRunner {
        fn new(stdout: &str, status: i32) -> Self {
            Self {
                output: CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    status: Some(status),
                },
                calls: Mutex::new(Vec::new()),
            }
        }

        fn last_args(&self) -> Vec<String> {
            self.calls.lock().unwrap().last().unwrap().1.clone()
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, program: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push((
                program.to_path_buf(),
                args.iter().map(|a| a.to_string()).collect(),
                envs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ));
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_parse_wine_version() {
        assert_eq!(parse_wine_version("wine-8.0 (Staging)\n").unwrap(), "8.0");
        assert_eq!(parse_wine_version("wine-9.0-rc2").unwrap(), "9.0-rc2");
        assert!(parse_wine_version("").is_err());
        assert!(parse_wine_version("   \n").is_err());
        assert!(parse_wine_version("unknown").is_err());
    }

    #[test]
    fn test_winedebug_for_level() {
        assert_eq!(winedebug_for_level(0), Some("-all"));
        assert_eq!(winedebug_for_level(1), Some(""));
        assert_eq!(winedebug_for_level(3), Some("warn+all"));
        assert_eq!(winedebug_for_level(9), Some("+all"));
        assert_eq!(winedebug_for_level(10), None);
        assert_eq!(winedebug_for_level(-1), None);
    }

    #[test]
    fn test_find_uninstaller_guid() {
        let runner = MockRunner::new(
            "{1D8E6291-B0D5-35EC-8441-6616F567A0F7}|||Microsoft Visual C++ 2010  x64 Redistributable\n\
             {E45D8920-A758-4088-B6C6-31DBB276992E}|||Notepad++\n",
            0,
        );
        let guid = find_uninstaller_guid(
            &runner,
            Path::new("/usr/bin/wine"),
            Path::new("/bottles/office"),
            "Notepad++",
        )
        .unwrap();
        assert_eq!(guid, "E45D8920-A758-4088-B6C6-31DBB276992E");

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].1, vec!["uninstaller", "--list"]);
        assert_eq!(
            calls[0].2,
            vec![("WINEPREFIX".to_string(), "/bottles/office".to_string())]
        );
    }

    #[test]
    fn test_find_uninstaller_guid_not_listed() {
        let runner = MockRunner::new("{ABC}|||Something\n", 0);
        let guid =
            find_uninstaller_guid(&runner, Path::new("wine"), Path::new("/p"), "Steam").unwrap();
        assert_eq!(guid, "");
    }

    #[test]
    fn test_winetricks_version() {
        let winetricks = Winetricks::new("/home/user/.winegui/winetricks");
        let runner = MockRunner::new("20240105-next - sha256sum: 1234\n", 0);
        assert_eq!(winetricks.version(&runner).unwrap(), "20240105");

        let runner = MockRunner::new("2024", 0);
        assert_eq!(winetricks.version(&runner).unwrap(), "");
    }

    #[test]
    fn test_set_virtual_desktop_clamps_small_resolution() {
        let winetricks = Winetricks::new("winetricks");
        let runner = MockRunner::new("", 0);

        winetricks
            .set_virtual_desktop(&runner, Path::new("/p"), "320x200")
            .unwrap();
        assert_eq!(runner.last_args(), vec!["vd=640x480"]);

        winetricks
            .set_virtual_desktop(&runner, Path::new("/p"), "1920x1080")
            .unwrap();
        assert_eq!(runner.last_args(), vec!["vd=1920x1080"]);
    }

    #[test]
    fn test_set_virtual_desktop_invalid_input() {
        let winetricks = Winetricks::new("winetricks");
        let runner = MockRunner::new("", 0);
        assert!(matches!(
            winetricks.set_virtual_desktop(&runner, Path::new("/p"), "1920"),
            Err(WineGuiError::Config(_))
        ));
        assert!(matches!(
            winetricks.set_virtual_desktop(&runner, Path::new("/p"), "99999999999x1080"),
            Err(WineGuiError::Config(_))
        ));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_winetricks_setters() {
        let winetricks = Winetricks::new("winetricks");
        let runner = MockRunner::new("", 0);

        winetricks
            .set_windows_version(&runner, Path::new("/p"), WindowsVersion::WindowsXP)
            .unwrap();
        assert_eq!(runner.last_args(), vec!["winxp"]);

        winetricks
            .set_audio_driver(&runner, Path::new("/p"), AudioDriver::Alsa)
            .unwrap();
        assert_eq!(runner.last_args(), vec!["sound=alsa"]);

        winetricks.disable_virtual_desktop(&runner, Path::new("/p")).unwrap();
        assert_eq!(runner.last_args(), vec!["vd=off"]);
    }

    #[test]
    fn test_winetricks_failure_is_command_error() {
        let winetricks = Winetricks::new("winetricks");
        let runner = MockRunner::new("", 1);
        assert!(matches!(
            winetricks.disable_virtual_desktop(&runner, Path::new("/p")),
            Err(WineGuiError::CommandExecution { .. })
        ));
    }

    #[cfg(unix)]
    fn fake_wineserver(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let fake = dir.join("wineserver");
        std::fs::write(&fake, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        fake
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_for_wineserver_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let fake = fake_wineserver(dir.path(), "sleep 5");

        let finished =
            wait_for_wineserver(&fake, dir.path(), Duration::from_millis(200)).unwrap();
        assert!(!finished);
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_for_wineserver_finishes() {
        let dir = tempfile::TempDir::new().unwrap();
        let fake = fake_wineserver(dir.path(), "exit 0");

        let finished = wait_for_wineserver(&fake, dir.path(), Duration::from_secs(5)).unwrap();
        assert!(finished);
    }
}
