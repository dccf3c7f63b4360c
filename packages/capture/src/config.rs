use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_NAME: &str = "domshot.config.json";

/// Capture settings. Every field has a default, so an empty JSON object is
/// a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Prefix for marker classes (`<prefix><index>`)
    pub prefix: String,

    /// Inset padding around the captured content, in px
    pub padding: f64,

    /// Padding of the `.body` wrapper inside the SVG document
    pub preview_padding: f64,

    /// Margin of the `.body` wrapper inside the SVG document
    pub preview_margin: f64,

    /// Selections whose box is not larger than this in both directions do
    /// not get a crop frame
    pub min_crop_size: f64,

    /// Background painted behind the foreign object
    pub background: String,

    pub file_name_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            prefix: "__domshot_".to_string(),
            padding: 8.0,
            preview_padding: 0.0,
            preview_margin: 0.0,
            min_crop_size: 20.0,
            background: "#fff".to_string(),
            file_name_prefix: "svgscreenshot3g_".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
