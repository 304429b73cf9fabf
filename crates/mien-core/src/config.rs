use std::path::PathBuf;

/// Default dissimilarity threshold for reconciliation.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 70.0;

/// Default number of samples captured per enrollment.
pub const DEFAULT_TARGET_SAMPLES: usize = 150;

/// Runtime configuration, loaded from environment variables.
pub struct Config {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Path to the SQLite identity database.
    pub db_path: PathBuf,
    /// Directory holding labeled sample images.
    pub samples_dir: PathBuf,
    /// Path to the persisted recognition artifact.
    pub model_path: PathBuf,
    /// Dissimilarity threshold: lower = stricter, higher = more permissive.
    pub confidence_threshold: f32,
    /// Samples to capture per enrollment.
    pub target_samples: usize,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MIEN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("mien")
            });

        let db_path = std::env::var("MIEN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("identities.db"));

        let samples_dir = std::env::var("MIEN_SAMPLES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("samples"));

        let model_path = std::env::var("MIEN_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("recognizer").join("model.json"));

        Self {
            data_dir,
            db_path,
            samples_dir,
            model_path,
            confidence_threshold: env_f32(
                "MIEN_CONFIDENCE_THRESHOLD",
                DEFAULT_CONFIDENCE_THRESHOLD,
            ),
            target_samples: env_usize("MIEN_TARGET_SAMPLES", DEFAULT_TARGET_SAMPLES),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
