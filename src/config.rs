use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RumxConfig {
    /// Separator for text bean paths, e.g. `MyFolder/MyBean/greeting`.
    #[serde(default = "default_path_separator")]
    pub path_separator: String,

    /// Log every resolved lookup at debug level.
    #[serde(default)]
    pub trace_attribute_access: bool,

    #[serde(default)]
    pub timer: TimerConfig,
}

impl Default for RumxConfig {
    fn default() -> Self {
        Self {
            path_separator: default_path_separator(),
            trace_attribute_access: false,
            timer: TimerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerConfig {
    /// Measurements longer than this are logged at warn level. Zero disables
    /// the check.
    #[serde(default = "default_slow_threshold", with = "duration_ms")]
    pub slow_threshold: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            slow_threshold: default_slow_threshold(),
        }
    }
}

impl RumxConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        let file = File::open(path)
            .map_err(|e| Error::config(format!("Failed to open config file: {}", e)))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
        config.validate()
    }

    pub fn from_str(s: &str) -> InternalResult<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        config.validate()
    }

    fn validate(self) -> InternalResult<Self> {
        if self.path_separator.is_empty() {
            return Err(Error::config("path_separator must not be empty"));
        }
        Ok(self)
    }
}

fn default_path_separator() -> String {
    "/".to_string()
}

fn default_slow_threshold() -> Duration {
    Duration::ZERO
}

// Duration型のシリアライズ/デシリアライズヘルパー
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
