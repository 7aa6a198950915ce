use anyhow::{Context, Result};
use facecheck_core::VerifierConfig;
use std::path::{Path, PathBuf};

/// Load configuration: optional TOML file, then `FACECHECK_*` environment
/// overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<VerifierConfig> {
    let mut config = match path {
        Some(p) => VerifierConfig::from_file(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => VerifierConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate().context("invalid configuration")?;

    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

/// Apply overrides from `lookup`. Unparseable values are ignored with a warning.
fn apply_overrides(config: &mut VerifierConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("FACECHECK_MODEL_DIR") {
        config.model_dir = PathBuf::from(dir);
    }
    config.match_threshold = parsed(&lookup, "FACECHECK_MATCH_THRESHOLD", config.match_threshold);
    config.detection_threshold = parsed(
        &lookup,
        "FACECHECK_DETECTION_THRESHOLD",
        config.detection_threshold,
    );
    config.embedding_dim = parsed(&lookup, "FACECHECK_EMBEDDING_DIM", config.embedding_dim);
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "ignoring unparseable override");
            default
        }),
        None => default,
    }
}
