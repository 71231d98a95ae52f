use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    pub bucket: String,

    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_path_style")]
    pub path_style: bool,

    pub concurrency: usize,

    #[serde(with = "humantime_serde", default)]
    pub warmup: Duration,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

fn default_path_style() -> bool {
    true
}
