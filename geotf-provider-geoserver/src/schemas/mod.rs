//! GeoServer and GeoWebCache resource schema definitions
//!
//! Each entity kind is one [`GeoserverSchemaConfig`]: the attribute schema
//! (with DTO paths in `provider_name`), how its identifier is built, which
//! endpoints it lives at, and the few behaviours that differ between kinds.
//! The lifecycle engine in `provider.rs` interprets these tables.

use std::sync::LazyLock;

use geotf_core::identifier::Identity;
use geotf_core::resource::{Attributes, Value};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use regex::Regex;

use crate::client::Service;

pub mod datastore;
pub mod featuretype;
pub mod gwc_blobstore;
pub mod gwc_disk_quota;
pub mod gwc_gridset;
pub mod gwc_wms_layer;
pub mod layergroup;
pub mod resource;
pub mod service_wms;
pub mod stores;
pub mod style;
pub mod urlcheck;
pub mod workspace;

/// HTTP verb used for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Post,
    Put,
}

/// Where a kind lives on the remote service
///
/// Paths are templates: `{attr}` is replaced by the URL-encoded value of a
/// key attribute, `/` included. `{attr*}` keeps the `/` of a value that is
/// itself a path (resource files). A `[...]` section is dropped entirely
/// when any attribute inside it is empty (e.g. a style outside any
/// workspace).
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Collection that receives creates when `create` is `Post`
    pub collection: &'static str,
    /// The object itself
    pub item: &'static str,
    pub create: WriteMethod,
    pub update: WriteMethod,
    /// Query sent with DELETE; carries the cascade flags
    pub delete_query: &'static [(&'static str, &'static str)],
    /// Boolean attributes sent as query parameters on create
    pub create_query: &'static [&'static str],
}

impl Endpoint {
    /// Kind created by POST to a collection and updated by PUT on the item
    pub const fn collection(collection: &'static str, item: &'static str) -> Self {
        Self {
            collection,
            item,
            create: WriteMethod::Post,
            update: WriteMethod::Put,
            delete_query: &[],
            create_query: &[],
        }
    }

    /// Kind created and updated by PUT on the item
    pub const fn item(item: &'static str) -> Self {
        Self {
            collection: item,
            item,
            create: WriteMethod::Put,
            update: WriteMethod::Put,
            delete_query: &[],
            create_query: &[],
        }
    }

    pub const fn with_update(mut self, update: WriteMethod) -> Self {
        self.update = update;
        self
    }

    pub const fn with_delete_query(mut self, query: &'static [(&'static str, &'static str)]) -> Self {
        self.delete_query = query;
        self
    }

    pub const fn with_create_query(mut self, attributes: &'static [&'static str]) -> Self {
        self.create_query = attributes;
        self
    }
}

/// Body format of a kind
#[derive(Debug, Clone, Copy)]
pub enum Payload {
    /// JSON document wrapped in a root element, e.g. `{"dataStore": {...}}`
    Json { root: &'static str },
    /// Raw body held in a single attribute
    Raw {
        attribute: &'static str,
        content_type: &'static str,
    },
}

/// Second creation step uploading a raw body to the item path
#[derive(Debug, Clone, Copy)]
pub struct Content {
    pub attribute: &'static str,
    pub content_type: fn(&Attributes) -> &'static str,
}

/// Optional substructure reported only when the user set it
#[derive(Debug, Clone, Copy)]
pub struct OptIn {
    /// Attribute holding the substructure
    pub attribute: &'static str,
    /// Derived boolean recording that the user opted in
    pub flag: &'static str,
}

/// Kind-specific DTO tweaks the declarative table cannot express
#[derive(Debug, Clone, Copy, Default)]
pub struct Hooks {
    pub encode: Option<fn(&Attributes, &mut serde_json::Value)>,
    pub decode: Option<fn(&serde_json::Value, &mut Attributes)>,
}

/// Schema configuration of one entity kind
#[derive(Debug, Clone)]
pub struct GeoserverSchemaConfig {
    /// Resource type name (e.g., "geoserver_datastore")
    pub resource_type: &'static str,
    pub service: Service,
    pub identity: Identity,
    pub endpoint: Endpoint,
    pub payload: Payload,
    pub content: Option<Content>,
    /// Item templates of dependent objects removed before this one
    pub dependents: &'static [&'static str],
    /// Delete the object if any part of creation fails, not only later steps
    pub compensate_on_failure: bool,
    pub opt_in: &'static [OptIn],
    pub hooks: Hooks,
    /// The resource schema with attribute definitions
    pub schema: ResourceSchema,
}

impl GeoserverSchemaConfig {
    pub fn new(
        resource_type: &'static str,
        service: Service,
        identity: Identity,
        endpoint: Endpoint,
        payload: Payload,
        schema: ResourceSchema,
    ) -> Self {
        Self {
            resource_type,
            service,
            identity,
            endpoint,
            payload,
            content: None,
            dependents: &[],
            compensate_on_failure: false,
            opt_in: &[],
            hooks: Hooks::default(),
            schema,
        }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_dependents(mut self, dependents: &'static [&'static str]) -> Self {
        self.dependents = dependents;
        self
    }

    pub fn compensate_on_failure(mut self) -> Self {
        self.compensate_on_failure = true;
        self
    }

    pub fn with_opt_in(mut self, opt_in: &'static [OptIn]) -> Self {
        self.opt_in = opt_in;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}

static OPTIONAL_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("valid optional section pattern"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)(\*?)\}").expect("valid placeholder pattern"));

fn placeholder_value<'a>(attributes: &'a Attributes, name: &str) -> &'a str {
    attributes.get(name).and_then(Value::as_str).unwrap_or("")
}

/// Encode a key as a single URL path segment, or as a sequence of segments
/// when the placeholder is path-style
fn encode_path_value(value: &str, path_style: bool) -> String {
    if !path_style {
        return urlencoding::encode(value).into_owned();
    }
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a key value contains a `.` or `..` path segment, which URL
/// normalization would resolve away
pub fn has_dot_segment(value: &str) -> bool {
    value.split('/').any(|segment| segment == "." || segment == "..")
}

/// Render an endpoint template from key attributes
pub fn render_path(template: &str, attributes: &Attributes) -> String {
    let with_sections = OPTIONAL_SECTION.replace_all(template, |caps: &regex::Captures| {
        let section = &caps[1];
        let complete = PLACEHOLDER
            .captures_iter(section)
            .all(|c| !placeholder_value(attributes, &c[1]).is_empty());
        if complete {
            section.to_string()
        } else {
            String::new()
        }
    });
    PLACEHOLDER
        .replace_all(&with_sections, |caps: &regex::Captures| {
            encode_path_value(placeholder_value(attributes, &caps[1]), &caps[2] == "*")
        })
        .into_owned()
}

// ===========================================================================
// Shared attribute types
// ===========================================================================

pub const EXPIRATION_POLICIES: &[&str] = &["LRU", "LFU"];
pub const TIME_UNITS: &[&str] = &["SECONDS", "MINUTES", "HOURS", "DAYS"];
pub const STORAGE_UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];

/// Attributes describing a bounding box at `path` (e.g. "nativeBoundingBox")
pub fn bounding_box_attributes(
    schema: ResourceSchema,
    prefix: &str,
    path: &str,
    force_new: bool,
) -> ResourceSchema {
    let mut schema = schema;
    for (suffix, field, attr_type) in [
        ("min_x", "minx", AttributeType::Float),
        ("max_x", "maxx", AttributeType::Float),
        ("min_y", "miny", AttributeType::Float),
        ("max_y", "maxy", AttributeType::Float),
        ("crs_class", "crs.@class", AttributeType::String),
        ("crs_value", "crs.$", AttributeType::String),
    ] {
        let mut attr = AttributeSchema::new(format!("{}_{}", prefix, suffix), attr_type)
            .with_provider_name(format!("{}.{}", path, field));
        if force_new {
            attr = attr.force_new();
        }
        schema = schema.attribute(attr);
    }
    schema
}

/// Metadata map stored as GeoServer entries
pub fn metadata_attribute() -> AttributeSchema {
    AttributeSchema::new("metadata", types::string_map())
        .with_description("Metadata entries as key/value pairs")
        .with_provider_name("metadata.entry")
}

/// Keyword list stored under `keywords.string`
pub fn keywords_attribute() -> AttributeSchema {
    AttributeSchema::new("keywords", types::string_list())
        .with_description("Keywords describing the object")
        .with_provider_name("keywords.string")
}
