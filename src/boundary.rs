use census::{extract_short_name, AdminArea};
use geojson::{Feature, FeatureCollection, JsonValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("feature {index} has no {property:?} property")]
    MissingProperty { index: usize, property: &'static str },
    #[error("feature {index} has no geometry")]
    MissingGeometry { index: usize },
    #[error("feature {index} ({name}) is not a polygon or multipolygon")]
    NotPolygonal { index: usize, name: String },
    #[error(transparent)]
    GeoJson(#[from] geojson::Error),
}

/// One 행정동 polygon as served by the boundary API.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryFeature {
    pub admin_code: String,
    /// Last token of `adm_nm`, e.g. `"사직동"`.
    pub admin_name: String,
    /// `adm_nm` as served, e.g. `"서울특별시 종로구 사직동"`.
    pub full_name: String,
    pub geometry: geo::Geometry<f64>,
}

impl AdminArea for BoundaryFeature {
    fn admin_name(&self) -> &str {
        &self.admin_name
    }

    fn qualified_name(&self) -> &str {
        &self.full_name
    }
}

impl BoundaryFeature {
    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property("adm_cd", self.admin_code.clone());
        feature.set_property("adm_nm", self.full_name.clone());
        feature
    }
}

// Codes come back as strings, but tolerate numbers.
fn text_property(
    feature: &Feature,
    index: usize,
    property: &'static str,
) -> Result<String, BoundaryError> {
    match feature.property(property) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        _ => Err(BoundaryError::MissingProperty { index, property }),
    }
}

pub fn features_from_collection(
    collection: FeatureCollection,
) -> Result<Vec<BoundaryFeature>, BoundaryError> {
    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let admin_code = text_property(&feature, index, "adm_cd")?;
            let full_name = text_property(&feature, index, "adm_nm")?;
            let admin_name = extract_short_name(&full_name).map_err(|_| {
                BoundaryError::MissingProperty {
                    index,
                    property: "adm_nm",
                }
            })?;
            let value = feature
                .geometry
                .ok_or(BoundaryError::MissingGeometry { index })?
                .value;
            match value {
                geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_) => {
                    Ok(BoundaryFeature {
                        admin_code,
                        admin_name,
                        full_name,
                        geometry: value.try_into()?,
                    })
                }
                _ => Err(BoundaryError::NotPolygonal {
                    index,
                    name: full_name,
                }),
            }
        })
        .collect()
}
