//! Serializable option sets for radar elements.
//!
//! Every field is optional. [`RadarAxis::serialize`](super::RadarAxis::serialize)
//! fills them all; [`deserialize`](super::RadarAxis::deserialize) applies
//! only the ones present, so a partial document tweaks an existing element.
//!
//! ```
//! use polaris_geometry::chart::RadarGridConfig;
//!
//! let config = RadarGridConfig::from_json(r#"{ "layout": "radial", "is_minor": true }"#).unwrap();
//! assert_eq!(config.is_minor, Some(true));
//! ```

use serde::{Deserialize, Serialize};

use super::labels::LabelsSettings;
use super::radar_grid::GridLayout;
use super::ticks::TicksSettings;
use crate::{ChartResult, Fill, Rect, Stroke};

/// Plain rectangle for configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for BoundsConfig {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<BoundsConfig> for Rect {
    fn from(bounds: BoundsConfig) -> Self {
        Rect::new(bounds.x, bounds.y, bounds.width, bounds.height)
    }
}

/// Options of a [`RadarAxis`](super::RadarAxis).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarAxisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<TicksSettings>,
}

/// Options of a [`RadarGrid`](super::RadarGrid).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarGridConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_bounds: Option<BoundsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<GridLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odd_fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub even_fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_first_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_last_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_minor: Option<bool>,
}

macro_rules! impl_json {
    ($($ty:ty),*) => {
        $(
            impl $ty {
                pub fn to_json(&self) -> ChartResult<String> {
                    Ok(serde_json::to_string_pretty(self)?)
                }

                pub fn from_json(json: &str) -> ChartResult<Self> {
                    Ok(serde_json::from_str(json)?)
                }
            }
        )*
    };
}

impl_json!(RadarAxisConfig, RadarGridConfig);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChartError;

    #[test]
    fn test_absent_fields_are_skipped() {
        let config = RadarAxisConfig {
            name: Some("speed".to_string()),
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("speed"));
        assert!(!json.contains("stroke"));
        assert_eq!(RadarAxisConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_grid_fill_and_layout_format() {
        let config = RadarGridConfig::from_json(
            r#"{ "layout": "radial", "odd_fill": "none", "parent_bounds": { "x": 0, "y": 0, "width": 10, "height": 20 } }"#,
        )
        .unwrap();
        assert_eq!(config.layout, Some(GridLayout::Radial));
        assert_eq!(config.odd_fill, Some(Fill::None));
        assert_eq!(
            config.parent_bounds.map(Rect::from),
            Some(Rect::new(0.0, 0.0, 10.0, 20.0))
        );
    }

    #[test]
    fn test_malformed_json_is_a_serialization_error() {
        let err = RadarGridConfig::from_json("{ \"layout\": 3 }").unwrap_err();
        assert!(matches!(err, ChartError::Serialization(_)));
    }
}
