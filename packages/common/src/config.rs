use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Driver configuration for a single named disk.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DiskConfig {
    /// Files under `root` on the local filesystem.
    Local {
        root: PathBuf,
        /// Public base URL. Default: "/storage".
        #[serde(default)]
        url: Option<String>,
        /// Largest accepted blob in bytes. Default: unlimited.
        #[serde(default)]
        max_size: Option<u64>,
    },
    /// Blobs kept in process memory.
    Memory {
        #[serde(default)]
        url: Option<String>,
    },
}

/// App-level storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Disk used by ownership relations unless overridden. Default: "local".
    #[serde(default = "default_disk")]
    pub default_disk: String,
    /// Disk holding staged uploads. Default: "temp".
    #[serde(default = "default_temp_disk")]
    pub temp_disk: String,
    /// Directory for MIME sniffing scratch files. Default: the system temp dir.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// Route prefix under which staged uploads are served. Default: "/api/v1/temp-files".
    #[serde(default = "default_temp_url")]
    pub temp_url: String,
    /// Named disks. Default: "local" and "temp" under `./storage`.
    #[serde(default = "default_disks")]
    pub disks: HashMap<String, DiskConfig>,
}

fn default_disk() -> String {
    "local".into()
}
fn default_temp_disk() -> String {
    "temp".into()
}
fn default_temp_url() -> String {
    "/api/v1/temp-files".into()
}
fn default_disks() -> HashMap<String, DiskConfig> {
    HashMap::from([
        (
            "local".to_string(),
            DiskConfig::Local {
                root: PathBuf::from("storage/app"),
                url: Some("/storage".into()),
                max_size: None,
            },
        ),
        (
            "temp".to_string(),
            DiskConfig::Local {
                root: PathBuf::from("storage/temp"),
                url: None,
                max_size: None,
            },
        ),
    ])
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_disk: default_disk(),
            temp_disk: default_temp_disk(),
            scratch_dir: None,
            temp_url: default_temp_url(),
            disks: default_disks(),
        }
    }
}

impl StorageConfig {
    /// Configuration with in-memory `local` and `temp` disks.
    pub fn in_memory() -> Self {
        Self {
            disks: HashMap::from([
                ("local".to_string(), DiskConfig::Memory { url: None }),
                ("temp".to_string(), DiskConfig::Memory { url: None }),
            ]),
            ..Self::default()
        }
    }
}
