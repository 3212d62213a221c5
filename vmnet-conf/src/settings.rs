use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default locations of the files each subcommand reads.
///
/// Relative paths are taken relative to the directory holding the settings
/// file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub dhcpd_conf: Option<PathBuf>,
    pub netmap: Option<PathBuf>,
    pub networking: Option<PathBuf>,
    pub dhcpd_leases: Option<PathBuf>,
    pub apple_leases: Option<PathBuf>,
}

/// Which configured file a subcommand wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKey {
    DhcpdConf,
    Netmap,
    Networking,
    DhcpdLeases,
    AppleLeases,
}

impl SettingsKey {
    pub fn name(self) -> &'static str {
        match self {
            SettingsKey::DhcpdConf => "dhcpd_conf",
            SettingsKey::Netmap => "netmap",
            SettingsKey::Networking => "networking",
            SettingsKey::DhcpdLeases => "dhcpd_leases",
            SettingsKey::AppleLeases => "apple_leases",
        }
    }
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl Settings {
    pub fn get(&self, key: SettingsKey) -> Option<&Path> {
        match key {
            SettingsKey::DhcpdConf => self.dhcpd_conf.as_deref(),
            SettingsKey::Netmap => self.netmap.as_deref(),
            SettingsKey::Networking => self.networking.as_deref(),
            SettingsKey::DhcpdLeases => self.dhcpd_leases.as_deref(),
            SettingsKey::AppleLeases => self.apple_leases.as_deref(),
        }
    }

    /// An explicit path wins over the configured one.
    pub fn resolve(&self, explicit: Option<&Path>, key: SettingsKey) -> Option<PathBuf> {
        explicit
            .or_else(|| self.get(key))
            .map(Path::to_path_buf)
    }

    fn anchor(mut self, base: &Path) -> Self {
        for slot in [
            &mut self.dhcpd_conf,
            &mut self.netmap,
            &mut self.networking,
            &mut self.dhcpd_leases,
            &mut self.apple_leases,
        ] {
            if let Some(path) = slot.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
        self
    }
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let settings = parse_settings(&raw, path.display().to_string())?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(settings.anchor(base))
}

fn parse_settings(raw: &str, path: String) -> Result<Settings, SettingsLoadError> {
    toml::from_str(raw).map_err(|source| SettingsLoadError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn relative_paths_follow_the_settings_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vmnet-conf.toml");
        let mut file = fs::File::create(&path).expect("create");
        writeln!(file, "networking = \"networking\"").expect("write");
        writeln!(file, "dhcpd_leases = \"/var/db/vmware/vmnet-dhcpd-vmnet8.leases\"")
            .expect("write");

        let settings = load_settings(&path).expect("settings");
        assert_eq!(
            settings.get(SettingsKey::Networking),
            Some(dir.path().join("networking").as_path())
        );
        assert_eq!(
            settings.get(SettingsKey::DhcpdLeases),
            Some(Path::new("/var/db/vmware/vmnet-dhcpd-vmnet8.leases"))
        );
        assert_eq!(settings.get(SettingsKey::Netmap), None);
    }

    #[test]
    fn explicit_path_overrides_setting() {
        let settings = Settings {
            netmap: Some(PathBuf::from("/etc/netmap.conf")),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolve(Some(Path::new("other.conf")), SettingsKey::Netmap),
            Some(PathBuf::from("other.conf"))
        );
        assert_eq!(
            settings.resolve(None, SettingsKey::Netmap),
            Some(PathBuf::from("/etc/netmap.conf"))
        );
        assert_eq!(settings.resolve(None, SettingsKey::AppleLeases), None);
    }

    #[test]
    fn unknown_keys_and_missing_files_are_reported() {
        let err = parse_settings("dhcpd = \"x\"", "inline".to_string()).expect_err("unknown key");
        assert!(err.to_string().contains("inline"));

        let err = load_settings(Path::new("/nonexistent/vmnet-conf.toml")).expect_err("missing");
        assert!(matches!(err, SettingsLoadError::Io { .. }));
    }
}
