//! Launching the notifier when the user logs in.
//!
//! Each supported platform has a folder whose files are started at login; we
//! register by writing a small launcher there and unregister by deleting
//! it.
//!
//! | Platform | Launcher |
//! |----------|----------|
//! | Linux    | `<config_dir>/autostart/plugin-deals-notifier.desktop` (XDG autostart) |
//! | Windows  | `PluginDealsNotifier.cmd` in the per-user Startup folder |
//! | other    | unsupported; toggling reports an error and changes nothing |

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StartupError;

/// Installs or removes the login launcher.
pub trait Autostart: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> Result<(), StartupError>;
}

/// A launcher file at a fixed path.
pub struct LaunchEntry {
    path: PathBuf,
    contents: String,
}

impl LaunchEntry {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Autostart for LaunchEntry {
    fn set_enabled(&self, enabled: bool) -> Result<(), StartupError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| StartupError::Io { path, source }
        };

        if enabled {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir).map_err(io_err(dir))?;
            }
            fs::write(&self.path, &self.contents).map_err(io_err(&self.path))?;
            info!(path = %self.path.display(), "installed startup entry");
        } else {
            match fs::remove_file(&self.path) {
                Ok(()) => info!(path = %self.path.display(), "removed startup entry"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&self.path)(e)),
            }
        }
        Ok(())
    }
}

/// The launcher for the platform we are running on, resolved when toggled.
pub struct SystemAutostart;

impl Autostart for SystemAutostart {
    fn set_enabled(&self, enabled: bool) -> Result<(), StartupError> {
        let entry = platform_entry()?;
        debug!(path = %entry.path().display(), enabled, "updating startup entry");
        entry.set_enabled(enabled)
    }
}

#[cfg(target_os = "linux")]
fn platform_entry() -> Result<LaunchEntry, StartupError> {
    let exe = std::env::current_exe().map_err(StartupError::NoExecutable)?;
    let dir = dirs::config_dir()
        .ok_or(StartupError::NoConfigDir)?
        .join("autostart");
    Ok(LaunchEntry::new(
        dir.join("plugin-deals-notifier.desktop"),
        desktop_entry(&exe),
    ))
}

#[cfg(windows)]
fn platform_entry() -> Result<LaunchEntry, StartupError> {
    let exe = std::env::current_exe().map_err(StartupError::NoExecutable)?;
    // dirs::config_dir is %APPDATA% (Roaming) on Windows.
    let dir = dirs::config_dir()
        .ok_or(StartupError::NoConfigDir)?
        .join(r"Microsoft\Windows\Start Menu\Programs\Startup");
    Ok(LaunchEntry::new(
        dir.join("PluginDealsNotifier.cmd"),
        format!("@echo off\r\nstart \"\" \"{}\"\r\n", exe.display()),
    ))
}

#[cfg(not(any(target_os = "linux", windows)))]
fn platform_entry() -> Result<LaunchEntry, StartupError> {
    Err(StartupError::PlatformUnsupported(std::env::consts::OS))
}

/// XDG desktop entry that opens the notifier in a terminal.
#[cfg(target_os = "linux")]
fn desktop_entry(exe: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=Plugin Deals Notifier\n\
         Exec=\"{}\"\n\
         Terminal=true\n\
         X-GNOME-Autostart-enabled=true\n",
        exe.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_writes_launcher_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let entry = LaunchEntry::new(dir.path().join("autostart").join("app.desktop"), "launch");

        entry.set_enabled(true).unwrap();

        assert_eq!(fs::read_to_string(entry.path()).unwrap(), "launch");
    }

    #[test]
    fn disable_removes_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let entry = LaunchEntry::new(dir.path().join("app.desktop"), "launch");
        entry.set_enabled(true).unwrap();

        entry.set_enabled(false).unwrap();

        assert!(!entry.path().exists());
    }

    #[test]
    fn disable_without_launcher_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let entry = LaunchEntry::new(dir.path().join("never-written.desktop"), "launch");

        assert!(entry.set_enabled(false).is_ok());
    }

    #[test]
    fn unwritable_location_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // The launcher path is an existing directory.
        let entry = LaunchEntry::new(dir.path(), "launch");

        assert!(matches!(
            entry.set_enabled(true),
            Err(StartupError::Io { .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn desktop_entry_runs_executable_in_terminal() {
        let text = desktop_entry(Path::new("/opt/notifier/plugin-deals-notifier"));

        assert!(text.starts_with("[Desktop Entry]\n"));
        assert!(text.contains("Exec=\"/opt/notifier/plugin-deals-notifier\"\n"));
        assert!(text.contains("Terminal=true\n"));
    }
}
