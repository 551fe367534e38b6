//! # Configuration
//!
//! [`EpocConfig`] holds everything needed to open a decoding session: the
//! dongle serial, the headset variant, and the acquisition settings.
//!
//! ## Loading Priority
//!
//! 1. Explicit struct fields (programmatic construction)
//! 2. Environment variables (`EMOTIV_EPOC_SERIAL`, `EMOTIV_EPOC_MODE`)
//! 3. TOML config file at an explicit path
//! 4. `./epoc.toml` in the current directory
//! 5. `~/.config/emotiv-epoc/epoc.toml`
//!
//! Environment variables override file values.
//!
//! ```toml
//! serial = "SN20120229000290"
//! mode = "research"
//!
//! [acquisition]
//! mode = "queued"
//! read_timeout_ms = 10
//! queue_capacity = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EpocError, EpocResult};
use crate::key::{DeviceMode, SerialNumber};

/// Default transport read timeout in milliseconds.
const DEFAULT_READ_TIMEOUT_MS: u64 = 10;

/// Default number of snapshots buffered between producer and consumer.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How decoded frames reach the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    /// Every getter performs one blocking read-decrypt-decode cycle.
    #[default]
    Synchronous,
    /// A background producer publishes snapshots through a channel.
    Queued,
}

impl std::str::FromStr for AcquisitionMode {
    type Err = EpocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "synchronous" | "sync" => Ok(AcquisitionMode::Synchronous),
            "queued" => Ok(AcquisitionMode::Queued),
            other => Err(EpocError::ConfigError {
                reason: format!(
                    "unknown acquisition mode '{other}' (expected 'synchronous' or 'queued')"
                ),
            }),
        }
    }
}

/// Settings for the acquisition loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Publish discipline.
    #[serde(default)]
    pub mode: AcquisitionMode,

    /// Timeout passed to every transport read, in milliseconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Snapshots buffered in queued mode before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Configuration for an EPOC decoding session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpocConfig {
    /// Dongle serial string. Usually read from the USB descriptor instead.
    #[serde(default)]
    pub serial: Option<String>,

    /// Headset variant.
    #[serde(default)]
    pub mode: DeviceMode,

    /// Acquisition settings.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

// ─── Defaults ───────────────────────────────────────────────────────────

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            mode: AcquisitionMode::default(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl AcquisitionConfig {
    /// Read timeout as a [`Duration`].
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Check values that would make the loop unusable.
    ///
    /// # Errors
    /// Returns [`EpocError::ConfigError`] for a zero queue capacity.
    pub fn validate(&self) -> EpocResult<()> {
        if self.queue_capacity == 0 {
            return Err(EpocError::ConfigError {
                reason: "acquisition.queue_capacity must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ─── EpocConfig impl ────────────────────────────────────────────────────

impl EpocConfig {
    /// Create a config for a known serial (all other fields use defaults).
    pub fn new(serial: impl Into<String>, mode: DeviceMode) -> Self {
        Self {
            serial: Some(serial.into()),
            mode,
            acquisition: AcquisitionConfig::default(),
        }
    }

    /// Load config from environment variables.
    ///
    /// Optional: `EMOTIV_EPOC_SERIAL`, `EMOTIV_EPOC_MODE`
    ///
    /// # Errors
    /// Returns [`EpocError::ConfigError`] if `EMOTIV_EPOC_MODE` is not a
    /// known device mode.
    pub fn from_env() -> EpocResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load config from a TOML file, with environment variable overrides.
    ///
    /// # Errors
    /// Returns [`EpocError::ConfigError`] if the file cannot be read, does not
    /// parse, or holds invalid values.
    #[cfg(feature = "config-toml")]
    pub fn from_file(path: impl AsRef<Path>) -> EpocResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| EpocError::ConfigError {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_env_overrides()?;
        config.acquisition.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Discover and load config from the standard search path:
    ///
    /// 1. Explicit path (if `Some`)
    /// 2. `EMOTIV_EPOC_CONFIG` environment variable
    /// 3. `./epoc.toml`
    /// 4. `~/.config/emotiv-epoc/epoc.toml`
    ///
    /// Falls back to environment-variable-only config if no file is found.
    ///
    /// # Errors
    /// Returns any error of [`from_file`](Self::from_file) or
    /// [`from_env`](Self::from_env).
    #[cfg(feature = "config-toml")]
    pub fn discover(explicit_path: Option<&Path>) -> EpocResult<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("EMOTIV_EPOC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        let local_path = PathBuf::from("epoc.toml");
        if local_path.exists() {
            return Self::from_file(&local_path);
        }

        if let Some(home_path) = dirs_config_path() {
            if home_path.exists() {
                return Self::from_file(&home_path);
            }
        }

        Self::from_env()
    }

    /// The configured serial as a key-derivation input.
    ///
    /// # Errors
    /// Returns [`EpocError::ConfigError`] if no serial is configured, or
    /// [`EpocError::InvalidSerial`] if it is too short.
    pub fn serial_number(&self) -> EpocResult<SerialNumber> {
        let serial = self.serial.as_deref().ok_or_else(|| EpocError::ConfigError {
            reason: "no serial configured (set `serial` or EMOTIV_EPOC_SERIAL)".into(),
        })?;
        SerialNumber::new(serial.as_bytes())
    }

    fn apply_env_overrides(&mut self) -> EpocResult<()> {
        if let Ok(serial) = std::env::var("EMOTIV_EPOC_SERIAL") {
            self.serial = Some(serial);
        }
        if let Ok(mode) = std::env::var("EMOTIV_EPOC_MODE") {
            self.mode = mode.parse()?;
        }
        Ok(())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

/// Platform-appropriate config file path.
#[cfg(feature = "config-toml")]
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|dir| PathBuf::from(dir).join("emotiv-epoc").join("epoc.toml"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(|dir| {
            PathBuf::from(dir)
                .join(".config")
                .join("emotiv-epoc")
                .join("epoc.toml")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "EMOTIV_EPOC_SERIAL",
        "EMOTIV_EPOC_MODE",
        "EMOTIV_EPOC_CONFIG",
        "HOME",
        "APPDATA",
    ];

    struct EnvGuard {
        saved: Vec<(&'static str, Option<OsString>)>,
    }

    impl EnvGuard {
        fn capture(keys: &[&'static str]) -> Self {
            let saved = keys.iter().map(|k| (*k, std::env::var_os(k))).collect();
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                // SAFETY: env mutation is serialized by ENV_LOCK.
                unsafe {
                    if let Some(value) = value {
                        std::env::set_var(key, value);
                    } else {
                        std::env::remove_var(key);
                    }
                }
            }
        }
    }

    fn set_env(key: &str, value: impl AsRef<std::ffi::OsStr>) {
        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe { std::env::remove_var(key) }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unique_temp_dir(label: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "emotiv-epoc-config-tests-{}-{}-{}",
            label,
            std::process::id(),
            now
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_serial_config(path: &Path, serial: &str) {
        fs::write(path, format!("serial = \"{serial}\"\n")).unwrap();
    }

    #[test]
    fn test_new_defaults() {
        let config = EpocConfig::new("SN20120229000290", DeviceMode::Consumer);
        assert_eq!(config.serial.as_deref(), Some("SN20120229000290"));
        assert_eq!(config.mode, DeviceMode::Consumer);
        assert_eq!(config.acquisition.mode, AcquisitionMode::Synchronous);
        assert_eq!(config.acquisition.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
        assert_eq!(config.acquisition.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.acquisition.read_timeout(), Duration::from_millis(10));
    }

    #[test]
    fn test_acquisition_mode_from_str() {
        assert_eq!(
            "queued".parse::<AcquisitionMode>().unwrap(),
            AcquisitionMode::Queued
        );
        assert_eq!(
            "Synchronous".parse::<AcquisitionMode>().unwrap(),
            AcquisitionMode::Synchronous
        );
        assert!(matches!(
            "threaded".parse::<AcquisitionMode>(),
            Err(EpocError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let acquisition = AcquisitionConfig {
            queue_capacity: 0,
            ..AcquisitionConfig::default()
        };
        assert!(matches!(
            acquisition.validate(),
            Err(EpocError::ConfigError { .. })
        ));
        assert!(AcquisitionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_serial_number() {
        let config = EpocConfig::new("123456789ABCDEF0", DeviceMode::Research);
        assert_eq!(
            config.serial_number().unwrap().as_bytes(),
            b"123456789ABCDEF0"
        );

        let missing = EpocConfig::default().serial_number().unwrap_err();
        assert!(matches!(missing, EpocError::ConfigError { .. }));

        let short = EpocConfig::new("SN123", DeviceMode::Research)
            .serial_number()
            .unwrap_err();
        assert!(matches!(short, EpocError::InvalidSerial { len: 5 }));
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_deserialize_toml() {
        let toml_str = r#"
            serial = "SN20120229000290"
            mode = "consumer"

            [acquisition]
            mode = "queued"
            queue_capacity = 64
        "#;

        let config: EpocConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.as_deref(), Some("SN20120229000290"));
        assert_eq!(config.mode, DeviceMode::Consumer);
        assert_eq!(config.acquisition.mode, AcquisitionMode::Queued);
        assert_eq!(config.acquisition.queue_capacity, 64);
        assert_eq!(config.acquisition.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
    }

    #[test]
    fn test_from_env_overrides_and_errors() {
        let _lock = env_lock();
        let _env = EnvGuard::capture(ENV_KEYS);

        remove_env("EMOTIV_EPOC_SERIAL");
        remove_env("EMOTIV_EPOC_MODE");
        let config = EpocConfig::from_env().unwrap();
        assert!(config.serial.is_none());
        assert_eq!(config.mode, DeviceMode::Research);

        set_env("EMOTIV_EPOC_SERIAL", "SN-FROM-ENV-0000");
        set_env("EMOTIV_EPOC_MODE", "consumer");
        let config = EpocConfig::from_env().unwrap();
        assert_eq!(config.serial.as_deref(), Some("SN-FROM-ENV-0000"));
        assert_eq!(config.mode, DeviceMode::Consumer);

        set_env("EMOTIV_EPOC_MODE", "developer");
        let err = EpocConfig::from_env().unwrap_err();
        assert!(
            err.to_string().contains("developer"),
            "unexpected error: {err}"
        );
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_from_file_env_overrides_precedence() {
        let _lock = env_lock();
        let _env = EnvGuard::capture(ENV_KEYS);

        let dir = unique_temp_dir("from-file-overrides");
        let config_path = dir.join("epoc.toml");
        fs::write(
            &config_path,
            "serial = \"SN-FROM-FILE-000\"\nmode = \"research\"\n",
        )
        .unwrap();

        set_env("EMOTIV_EPOC_SERIAL", "SN-FROM-ENV-0000");
        set_env("EMOTIV_EPOC_MODE", "consumer");

        let config = EpocConfig::from_file(&config_path).unwrap();
        assert_eq!(config.serial.as_deref(), Some("SN-FROM-ENV-0000"));
        assert_eq!(config.mode, DeviceMode::Consumer);

        fs::remove_dir_all(dir).unwrap();
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_from_file_missing_and_invalid_errors() {
        let _lock = env_lock();
        let _env = EnvGuard::capture(ENV_KEYS);
        remove_env("EMOTIV_EPOC_MODE");
        let dir = unique_temp_dir("from-file-errors");

        let missing = EpocConfig::from_file(dir.join("missing.toml")).unwrap_err();
        assert!(matches!(missing, EpocError::ConfigError { .. }));
        assert!(
            missing.to_string().contains("Failed to read config file"),
            "unexpected error: {missing}"
        );

        let invalid_path = dir.join("invalid.toml");
        fs::write(&invalid_path, "serial = [").unwrap();
        let invalid = EpocConfig::from_file(&invalid_path).unwrap_err();
        assert!(matches!(invalid, EpocError::ConfigError { .. }));

        let zero_path = dir.join("zero.toml");
        fs::write(&zero_path, "[acquisition]\nqueue_capacity = 0\n").unwrap();
        let zero = EpocConfig::from_file(&zero_path).unwrap_err();
        assert!(zero.to_string().contains("queue_capacity"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_discover_search_priority() {
        let _lock = env_lock();
        let _env = EnvGuard::capture(ENV_KEYS);
        remove_env("EMOTIV_EPOC_SERIAL");
        remove_env("EMOTIV_EPOC_MODE");

        let root = unique_temp_dir("discover-priority");
        let explicit_path = root.join("explicit.toml");
        let env_path = root.join("env.toml");
        write_serial_config(&explicit_path, "SN-EXPLICIT-0000");
        write_serial_config(&env_path, "SN-ENV-FILE-0000");

        let home_root = root.join("home-root");
        let home_config = {
            #[cfg(target_os = "windows")]
            {
                set_env("APPDATA", &home_root);
                home_root.join("emotiv-epoc").join("epoc.toml")
            }
            #[cfg(not(target_os = "windows"))]
            {
                set_env("HOME", &home_root);
                home_root
                    .join(".config")
                    .join("emotiv-epoc")
                    .join("epoc.toml")
            }
        };
        fs::create_dir_all(home_config.parent().unwrap()).unwrap();
        write_serial_config(&home_config, "SN-HOME-0000000");

        let explicit = EpocConfig::discover(Some(&explicit_path)).unwrap();
        assert_eq!(explicit.serial.as_deref(), Some("SN-EXPLICIT-0000"));

        set_env("EMOTIV_EPOC_CONFIG", &env_path);
        let via_env_pointer = EpocConfig::discover(None).unwrap();
        assert_eq!(via_env_pointer.serial.as_deref(), Some("SN-ENV-FILE-0000"));

        // A pointer to a missing file falls through to the next source.
        set_env("EMOTIV_EPOC_CONFIG", root.join("absent.toml"));
        if !Path::new("epoc.toml").exists() {
            let via_home = EpocConfig::discover(None).unwrap();
            assert_eq!(via_home.serial.as_deref(), Some("SN-HOME-0000000"));

            fs::remove_file(&home_config).unwrap();
            set_env("EMOTIV_EPOC_SERIAL", "SN-FALLBACK-0000");
            let via_env_only = EpocConfig::discover(None).unwrap();
            assert_eq!(via_env_only.serial.as_deref(), Some("SN-FALLBACK-0000"));
        }

        fs::remove_dir_all(root).unwrap();
    }
}
