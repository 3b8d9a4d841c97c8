use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};
use serde::Serialize;

use crate::data::model::Value;

const DEFAULT_COLOR: &str = "#808080";

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues, as
/// `#rrggbb` strings.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category value → colour
// ---------------------------------------------------------------------------

/// Maps the values of a categorical column to colours for a chart legend.
///
/// Built from the whole dataset, not the filtered view, so a category
/// keeps its colour while filters change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorMap {
    pub column: String,
    mapping: BTreeMap<Value, String>,
    default_color: String,
}

/// One legend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

impl ColorMap {
    /// Evenly spaced hues over the sorted distinct values. Missing values
    /// take the default grey.
    pub fn categorical(column: &str, unique_values: &BTreeSet<Value>) -> Self {
        let present: Vec<&Value> = unique_values.iter().filter(|v| !v.is_missing()).collect();
        let palette = generate_palette(present.len());
        let mapping = present
            .into_iter()
            .zip(palette)
            .map(|(v, c)| (v.clone(), c))
            .collect();

        ColorMap {
            column: column.to_string(),
            mapping,
            default_color: DEFAULT_COLOR.to_string(),
        }
    }

    /// An explicit scale, e.g. Gold/Silver/Bronze to chosen colours. Extra
    /// domain values beyond `range` fall back to the default colour.
    pub fn fixed<D, R>(column: &str, domain: D, range: R) -> Self
    where
        D: IntoIterator<Item = Value>,
        R: IntoIterator<Item = String>,
    {
        ColorMap {
            column: column.to_string(),
            mapping: domain.into_iter().zip(range).collect(),
            default_color: DEFAULT_COLOR.to_string(),
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &Value) -> &str {
        self.mapping
            .get(value)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    /// Return the legend entries (value label → colour) for the renderer.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        self.mapping
            .iter()
            .map(|(v, c)| LegendEntry {
                label: v.to_string(),
                color: c.clone(),
            })
            .collect()
    }
}
