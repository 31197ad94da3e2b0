//! gwc_gridset schema definition

use serde_json::{Value as Json, json};

use super::{Endpoint, GeoserverSchemaConfig, Hooks, Payload};
use crate::client::Service;
use crate::mapping::{as_array, get_path, set_path};
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::resource::{Attributes, Value};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Extent attributes in the order of `extent.coords.double`
const EXTENT: [&str; 4] = ["extent_min_x", "extent_min_y", "extent_max_x", "extent_max_y"];

fn scale_fields() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("name", AttributeType::String)
            .required()
            .with_description("Name of the level (0, 1, 2, ...)"),
        AttributeSchema::new("denominator", AttributeType::Float).required(),
    ]
}

fn encode_gridset(attributes: &Attributes, dto: &mut Json) {
    let extent: Vec<f64> = EXTENT
        .iter()
        .map(|name| attributes.get(*name).and_then(Value::as_float).unwrap_or(0.0))
        .collect();
    set_path(dto, "extent.coords.double", json!(extent));

    let scales = attributes
        .get("scales")
        .and_then(Value::as_list)
        .unwrap_or_default();
    let (names, denominators): (Vec<_>, Vec<_>) = scales
        .iter()
        .filter_map(Value::as_map)
        .map(|scale| {
            (
                scale.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
                scale.get("denominator").and_then(Value::as_float).unwrap_or(0.0),
            )
        })
        .unzip();
    set_path(dto, "scaleNames.string", json!(names));
    set_path(dto, "scaleDenominators.double", json!(denominators));
}

fn decode_gridset(dto: &Json, attributes: &mut Attributes) {
    let extent = as_array(get_path(dto, "extent.coords.double"));
    if extent.len() == EXTENT.len() {
        for (name, coord) in EXTENT.iter().zip(extent) {
            if let Some(f) = coord.as_f64() {
                attributes.insert(name.to_string(), Value::Float(f));
            }
        }
    }

    let names = as_array(get_path(dto, "scaleNames.string"));
    let denominators = as_array(get_path(dto, "scaleDenominators.double"));
    let scales = denominators
        .iter()
        .enumerate()
        .map(|(i, denominator)| {
            let name = match names.get(i) {
                Some(Json::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Value::Map(
                [
                    ("name".to_string(), Value::String(name)),
                    (
                        "denominator".to_string(),
                        Value::Float(denominator.as_f64().unwrap_or(0.0)),
                    ),
                ]
                .into_iter()
                .collect(),
            )
        })
        .collect();
    attributes.insert("scales".to_string(), Value::List(scales));
}

/// Returns the schema config for gwc_gridset
pub fn gwc_gridset_config() -> GeoserverSchemaConfig {
    let mut schema = ResourceSchema::new("gwc_gridset")
        .with_description("A tiling scheme: CRS, extent, tile size and zoom levels")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new()
                .with_provider_name("name"),
        )
        .attribute(
            AttributeSchema::new("srs", types::positive_int())
                .required()
                .with_description("EPSG code of the CRS")
                .with_provider_name("srs.number"),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .with_default("")
                .with_provider_name("description"),
        )
        .attribute(
            AttributeSchema::new("align_top_left", AttributeType::Bool)
                .with_default(true)
                .with_provider_name("alignTopLeft"),
        )
        .attribute(
            AttributeSchema::new("y_coordinate_first", AttributeType::Bool)
                .with_default(true)
                .with_provider_name("yCoordinateFirst"),
        )
        .attribute(
            AttributeSchema::new("meters_per_unit", AttributeType::Float)
                .required()
                .with_provider_name("metersPerUnit"),
        )
        .attribute(
            AttributeSchema::new("pixel_size", AttributeType::Float)
                .required()
                .with_provider_name("pixelSize"),
        )
        .attribute(
            AttributeSchema::new("tile_height", types::positive_int())
                .required()
                .with_provider_name("tileHeight"),
        )
        .attribute(
            AttributeSchema::new("tile_width", types::positive_int())
                .required()
                .with_provider_name("tileWidth"),
        )
        .attribute(
            AttributeSchema::new("scales", types::block_list(scale_fields()))
                .required()
                .with_description("Zoom levels, from the coarsest"),
        );
    for name in EXTENT {
        schema = schema.attribute(AttributeSchema::new(name, AttributeType::Float).required());
    }

    GeoserverSchemaConfig::new(
        "gwc_gridset",
        Service::Tilecache,
        Identity::keys(&[KeyComponent::required("name")]),
        Endpoint::item("/rest/gridsets/{name}"),
        Payload::Json { root: "gridSet" },
        schema,
    )
    .with_hooks(Hooks {
        encode: Some(encode_gridset),
        decode: Some(decode_gridset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(name: &str, denominator: f64) -> Value {
        Value::Map(
            [
                ("name".to_string(), Value::from(name)),
                ("denominator".to_string(), Value::Float(denominator)),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn gridset_attributes() -> Attributes {
        let mut attrs = Attributes::new();
        for (name, value) in EXTENT.iter().zip([-180.0, -90.0, 180.0, 90.0]) {
            attrs.insert(name.to_string(), Value::Float(value));
        }
        attrs.insert(
            "scales".to_string(),
            Value::List(vec![scale("0", 279541132.0), scale("1", 139770566.0)]),
        );
        attrs
    }

    #[test]
    fn extent_and_scales_encode_as_arrays() {
        let mut dto = json!({});
        encode_gridset(&gridset_attributes(), &mut dto);
        assert_eq!(dto["extent"]["coords"]["double"], json!([-180.0, -90.0, 180.0, 90.0]));
        assert_eq!(dto["scaleNames"]["string"], json!(["0", "1"]));
        assert_eq!(dto["scaleDenominators"]["double"], json!([279541132.0, 139770566.0]));
    }

    #[test]
    fn extent_and_scales_decode_back() {
        let mut dto = json!({});
        encode_gridset(&gridset_attributes(), &mut dto);
        let mut attrs = Attributes::new();
        decode_gridset(&dto, &mut attrs);
        assert_eq!(attrs, gridset_attributes());
    }

    #[test]
    fn srs_lives_under_number() {
        let config = gwc_gridset_config();
        assert_eq!(
            config.schema.attributes["srs"].provider_name.as_deref(),
            Some("srs.number")
        );
    }
}
