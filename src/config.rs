use std::env;
use std::path::PathBuf;

pub const WAL_FILE_NAME: &str = "lodgr.wal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Appends after which the log is rewritten.
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            compact_threshold: 1000,
            metrics_port: None,
        }
    }
}

impl Config {
    /// `LODGR_DATA_DIR`, `LODGR_COMPACT_THRESHOLD`, `LODGR_METRICS_PORT`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Config::default();
        if let Some(dir) = lookup("LODGR_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("LODGR_COMPACT_THRESHOLD") {
            config.compact_threshold = raw
                .parse()
                .map_err(|e| anyhow::anyhow!("LODGR_COMPACT_THRESHOLD={raw}: {e}"))?;
        }
        if let Some(raw) = lookup("LODGR_METRICS_PORT") {
            config.metrics_port = Some(
                raw.parse()
                    .map_err(|e| anyhow::anyhow!("LODGR_METRICS_PORT={raw}: {e}"))?,
            );
        }
        Ok(config)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.wal_path(), PathBuf::from("./data").join(WAL_FILE_NAME));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LODGR_DATA_DIR", "/var/lib/lodgr"),
            ("LODGR_COMPACT_THRESHOLD", "50"),
            ("LODGR_METRICS_PORT", "9100"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/lodgr"));
        assert_eq!(config.compact_threshold, 50);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = Config::from_lookup(lookup(&[("LODGR_METRICS_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("LODGR_METRICS_PORT"));
    }
}
