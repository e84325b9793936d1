//! GeoJSON and standalone Leaflet HTML output for joined boundaries.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use census::JoinedFeature;
use geo::{BoundingRect, Rect};
use geojson::{FeatureCollection, GeoJson};
use serde_json::json;

use crate::boundary::BoundaryFeature;

/// YlOrRd, light to dark.
pub const DEFAULT_PALETTE: [&str; 6] = [
    "#ffffb2", "#fed976", "#feb24c", "#fd8d3c", "#f03b20", "#bd0026",
];
pub const NO_DATA_COLOR: &str = "#d9d9d9";
pub const OUTLINE_FILL: &str = "#B4D9FF";

const SEOUL_CITY_HALL: (f64, f64) = (37.5665, 126.9780);

/// Linear binning of a metric onto a palette.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
    palette: Vec<String>,
}

impl ColorScale {
    /// Scale spanning the finite values given. With no values the range is
    /// `0..0`; an empty palette falls back to [`DEFAULT_PALETTE`].
    pub fn from_values<I>(values: I, palette: &[&str]) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let palette = if palette.is_empty() {
            &DEFAULT_PALETTE[..]
        } else {
            palette
        };
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 0.0));
        Self {
            min,
            max,
            palette: palette.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    fn bin(&self, value: f64) -> usize {
        let n = self.palette.len();
        if self.max <= self.min {
            return 0;
        }
        let t = (value - self.min) / (self.max - self.min);
        ((t * n as f64).floor().max(0.0) as usize).min(n - 1)
    }

    pub fn color_for(&self, value: Option<f64>) -> &str {
        match value.filter(|v| v.is_finite()) {
            Some(v) => &self.palette[self.bin(v)],
            None => NO_DATA_COLOR,
        }
    }

    /// `(lower, upper, color)` for every bin. A flat scale has one bin.
    pub fn bins(&self) -> Vec<(f64, f64, &str)> {
        if self.max <= self.min {
            return vec![(self.min, self.max, self.palette[0].as_str())];
        }
        let n = self.palette.len();
        let step = (self.max - self.min) / n as f64;
        self.palette
            .iter()
            .enumerate()
            .map(|(i, color)| {
                let lo = self.min + step * i as f64;
                (lo, lo + step, color.as_str())
            })
            .collect()
    }
}

/// A property shown in the hover tooltip, with its display label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TooltipField {
    pub property: String,
    pub alias: String,
}

impl TooltipField {
    pub fn new(property: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            alias: alias.into(),
        }
    }
}

pub fn bounds_of<'a, I>(geometries: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = &'a geo::Geometry<f64>>,
{
    geometries
        .into_iter()
        .filter_map(|g| g.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}

// SGIS can serve projected coordinates (UTM-K); those cannot go on web tiles.
fn is_geographic(bounds: Option<Rect<f64>>) -> bool {
    bounds.map_or(true, |r| {
        r.min().x >= -180.0 && r.max().x <= 180.0 && r.min().y >= -90.0 && r.max().y <= 90.0
    })
}

pub fn choropleth_collection(
    joined: &[JoinedFeature<BoundaryFeature>],
    metric_property: &str,
    scale: &ColorScale,
) -> FeatureCollection {
    joined
        .iter()
        .map(|entry| {
            let mut feature = entry.feature.to_feature();
            let metric = entry.metric.as_ref();
            feature.set_property(
                "subgroup_population",
                metric.map(|m| m.subgroup_population),
            );
            feature.set_property(metric_property, entry.subgroup_percentage());
            feature.set_property("fill", scale.color_for(entry.subgroup_percentage()));
            feature
        })
        .collect()
}

pub fn outline_collection(features: &[BoundaryFeature]) -> FeatureCollection {
    features
        .iter()
        .map(|boundary| {
            let mut feature = boundary.to_feature();
            feature.set_property("fill", OUTLINE_FILL);
            feature
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Keeps embedded JSON from closing the surrounding <script>.
fn script_json(json: String) -> String {
    json.replace("</", "<\\/")
}

fn legend_html(title: &str, scale: &ColorScale) -> String {
    let mut rows = String::new();
    for (lo, hi, color) in scale.bins() {
        let span = if hi > lo {
            format!("{lo:.1} - {hi:.1}")
        } else {
            format!("{lo:.1}")
        };
        rows.push_str(&format!(
            "<div><i style=\"background:{color}\"></i>{span}</div>\n"
        ));
    }
    rows.push_str(&format!(
        "<div><i style=\"background:{NO_DATA_COLOR}\"></i>no data</div>\n"
    ));
    format!(
        "<div class=\"legend\"><b>{}</b>\n{rows}</div>",
        escape_html(title)
    )
}

/// Standalone Leaflet page showing `collection`, filled by each feature's
/// `fill` property.
pub fn render_html(
    title: &str,
    collection: &FeatureCollection,
    bounds: Option<Rect<f64>>,
    tooltip: &[TooltipField],
    legend: Option<(&str, &ColorScale)>,
) -> String {
    let data = script_json(GeoJson::from(collection.clone()).to_string());
    let fields = script_json(
        json!(tooltip
            .iter()
            .map(|f| [f.property.as_str(), f.alias.as_str()])
            .collect::<Vec<_>>())
        .to_string(),
    );
    let geographic = is_geographic(bounds);
    let view = match bounds {
        Some(r) => format!(
            "map.fitBounds([[{}, {}], [{}, {}]]);",
            r.min().y,
            r.min().x,
            r.max().y,
            r.max().x
        ),
        None => format!(
            "map.setView([{}, {}], 11);",
            SEOUL_CITY_HALL.0, SEOUL_CITY_HALL.1
        ),
    };
    let legend = legend
        .map(|(label, scale)| legend_html(label, scale))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body {{ margin: 0; height: 100%; font-family: sans-serif; }}
#map {{ position: absolute; top: 3em; bottom: 0; width: 100%; }}
h1 {{ margin: 0; padding: 0.4em; font-size: 1.4em; }}
.legend {{ position: absolute; right: 1em; bottom: 2em; z-index: 1000; background: white; padding: 0.5em; border-radius: 4px; font-size: 0.85em; }}
.legend i {{ display: inline-block; width: 1em; height: 1em; margin-right: 0.4em; vertical-align: middle; }}
</style>
</head>
<body>
<h1>{title}</h1>
<div id="map"></div>
{legend}
<script>
const data = {data};
const tooltipFields = {fields};
const geographic = {geographic};
const map = L.map('map', geographic ? {{}} : {{ crs: L.CRS.Simple, minZoom: -12 }});
if (geographic) {{
  L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
    attribution: '&copy; OpenStreetMap contributors'
  }}).addTo(map);
}}
const show = v => v === null || v === undefined
  ? 'no data'
  : (typeof v === 'number' ? v.toLocaleString(undefined, {{ maximumFractionDigits: 2 }}) : String(v));
// Built from text nodes; names and labels are never parsed as markup.
const tooltip = f => {{
  const box = document.createElement('div');
  for (const [p, a] of tooltipFields) {{
    const row = document.createElement('div');
    const label = document.createElement('b');
    label.textContent = a;
    row.append(label, ' ' + show(f.properties[p]));
    box.appendChild(row);
  }}
  return box;
}};
L.geoJSON(data, {{
  style: f => ({{ fillColor: f.properties.fill, color: 'black', weight: 0.5, fillOpacity: 0.6 }}),
  onEachFeature: (f, layer) => {{
    if (tooltipFields.length === 0) return;
    layer.bindTooltip(() => tooltip(f), {{ sticky: true }});
  }}
}}).addTo(map);
{view}
</script>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// GeoJSON plus HTML for a joined subgroup share.
pub fn render_choropleth(
    title: &str,
    joined: &[JoinedFeature<BoundaryFeature>],
    metric_property: &str,
    metric_alias: &str,
) -> (FeatureCollection, String) {
    let scale = ColorScale::from_values(
        joined.iter().filter_map(JoinedFeature::subgroup_percentage),
        &DEFAULT_PALETTE,
    );
    let collection = choropleth_collection(joined, metric_property, &scale);
    let bounds = bounds_of(joined.iter().map(|j| &j.feature.geometry));
    let tooltip = [
        TooltipField::new("adm_nm", "행정동"),
        TooltipField::new(metric_property, metric_alias),
    ];
    let html = render_html(
        title,
        &collection,
        bounds,
        &tooltip,
        Some((metric_alias, &scale)),
    );
    (collection, html)
}

/// GeoJSON plus HTML of the boundaries alone, in a single fill colour.
pub fn render_outline(title: &str, features: &[BoundaryFeature]) -> (FeatureCollection, String) {
    let collection = outline_collection(features);
    let bounds = bounds_of(features.iter().map(|f| &f.geometry));
    let tooltip = [TooltipField::new("adm_nm", "행정동")];
    let html = render_html(title, &collection, bounds, &tooltip, None);
    (collection, html)
}

/// Writes `<dir>/<stem>.geojson` and `<dir>/<stem>.html`.
pub fn write_map(
    dir: &Path,
    stem: &str,
    collection: FeatureCollection,
    html: &str,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let geojson_path = dir.join(format!("{stem}.geojson"));
    let html_path = dir.join(format!("{stem}.html"));
    fs::write(&geojson_path, GeoJson::from(collection).to_string())
        .with_context(|| format!("writing {}", geojson_path.display()))?;
    fs::write(&html_path, html).with_context(|| format!("writing {}", html_path.display()))?;
    Ok((geojson_path, html_path))
}
