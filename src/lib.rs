use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod batch;
pub mod compositor;
pub mod decode;
pub mod export;
pub mod fields;
pub mod geocode;
pub mod session;
pub mod startup_checks;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub app: AppConfig,
    pub fonts: FontConfig,
    pub branding: BrandingConfig,
    pub render: RenderConfig,
    pub geocode: GeocodeConfig,
    pub selection: SelectionConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

/// Font files for each text role. Roles without a file fall back to `text`,
/// then to the first loadable entry in `fallbacks`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontConfig {
    #[serde(default)]
    pub display: Option<PathBuf>,
    #[serde(default)]
    pub text: Option<PathBuf>,
    #[serde(default)]
    pub brand: Option<PathBuf>,
    #[serde(default)]
    pub tagline: Option<PathBuf>,
    #[serde(default)]
    pub fallbacks: Vec<PathBuf>,
    pub load_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrandingConfig {
    #[serde(default)]
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    pub quality: f32,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodeConfig {
    pub endpoint: String,
    pub language: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub default_location: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    pub max_files: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    pub output_directory: PathBuf,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            display: Some(PathBuf::from("assets/fonts/BigShouldersDisplay-Medium.ttf")),
            text: Some(PathBuf::from("assets/fonts/Roboto-Regular.ttf")),
            brand: Some(PathBuf::from("assets/fonts/Roboto-Medium.ttf")),
            tagline: Some(PathBuf::from("assets/fonts/RobotoCondensed-Thin.ttf")),
            fallbacks: vec![
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
                PathBuf::from("/Library/Fonts/Arial Unicode.ttf"),
                PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
            ],
            load_timeout_ms: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "Timemark".to_string(),
                log_level: "info".to_string(),
            },
            fonts: FontConfig::default(),
            branding: BrandingConfig {
                logo: Some(PathBuf::from("assets/logo.png")),
            },
            render: RenderConfig {
                quality: compositor::DEFAULT_QUALITY,
                concurrency: 1,
            },
            geocode: GeocodeConfig {
                endpoint: "https://nominatim.openstreetmap.org/reverse".to_string(),
                language: "vi".to_string(),
                timeout_secs: 8,
                user_agent: concat!("timemark/", env!("CARGO_PKG_VERSION")).to_string(),
                default_location: "Hà Nội, Việt Nam".to_string(),
            },
            selection: SelectionConfig { max_files: 5 },
            export: ExportConfig {
                output_directory: PathBuf::from("watermarked"),
            },
        }
    }
}

impl Config {
    /// Parse a TOML document into a `Config`.
    pub fn from_toml(content: &str) -> Result<Self, toml_edit::de::Error> {
        toml_edit::de::from_str::<Config>(content)
    }

    /// Apply command line overrides for a render run. Everything after this,
    /// startup checks included, sees the overridden values.
    pub fn with_render_overrides(mut self, quality: Option<f32>, output: Option<PathBuf>) -> Self {
        if let Some(quality) = quality {
            self.render.quality = quality;
        }
        if let Some(output) = output {
            self.export.output_directory = output;
        }
        self
    }
}
