use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create output directory: {0}")]
    OutputDirectoryCreationFailed(#[from] std::io::Error),

    #[error("No font file found for: {0}")]
    FontMissing(String),

    #[error("Logo file missing: {0}")]
    LogoMissing(String),
}

impl StartupCheckError {
    /// Whether rendering cannot work at all. Missing fonts and logo only
    /// reduce what gets drawn.
    pub fn is_critical(&self) -> bool {
        matches!(self, StartupCheckError::OutputDirectoryCreationFailed(_))
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let output_dir = &config.export.output_directory;
    if !output_dir.exists() {
        info!("Output directory does not exist, creating: {:?}", output_dir);
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            error!("Failed to create output directory {:?}: {}", output_dir, e);
            errors.push(StartupCheckError::OutputDirectoryCreationFailed(e));
        } else {
            info!("Output directory created successfully");
        }
    } else {
        info!("Output directory exists: {:?}", output_dir);
    }

    let fonts = [
        ("display", config.fonts.display.as_deref()),
        ("text", config.fonts.text.as_deref()),
        ("brand", config.fonts.brand.as_deref()),
        ("tagline", config.fonts.tagline.as_deref()),
    ];
    let fallback = config.fonts.fallbacks.iter().find(|path| path.exists());
    for (role, path) in fonts {
        match path {
            Some(path) if path.exists() => info!("Font for {} text found: {:?}", role, path),
            _ => match fallback {
                Some(fallback) => warn!(
                    "Font for {} text missing ({:?}), falling back to {:?}",
                    role, path, fallback
                ),
                None => {
                    warn!("No font available for {} text", role);
                    errors.push(StartupCheckError::FontMissing(role.to_string()));
                }
            },
        }
    }

    if let Some(logo) = &config.branding.logo {
        if logo.exists() {
            info!("Logo found: {:?}", logo);
        } else {
            warn!("Logo missing, watermarks will be drawn without it: {:?}", logo);
            errors.push(StartupCheckError::LogoMissing(display(logo)));
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
