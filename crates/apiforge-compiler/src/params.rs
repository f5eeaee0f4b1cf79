//! Route parameter classification.
//!
//! Payload attributes named after a path wildcard are path parameters and are
//! always required. Everything else goes in the query string with its
//! declared required flag. Attributes carrying credentials are left out:
//! they belong to the security schemes, not to the parameter list.

use apiforge_design::{extract_wildcards, Attribute, AttributeType, Primitive};

use crate::document::{Parameter, ParameterLocation, Schema};

/// Classify payload attributes for the route at `path`, rendering
/// descriptions and examples for `locale`.
pub fn classify(attributes: &[Attribute], path: &str, locale: &str) -> Vec<Parameter> {
    let wildcards = extract_wildcards(path);

    attributes
        .iter()
        .filter(|attribute| attribute.security_role.is_none())
        .map(|attribute| {
            let (location, required) = if wildcards.contains(&attribute.name) {
                (ParameterLocation::Path, true)
            } else {
                (ParameterLocation::Query, attribute.required)
            };

            Parameter {
                location,
                name: attribute.name.clone(),
                description: attribute
                    .description
                    .as_ref()
                    .map(|d| d.resolve(locale).clone()),
                required,
                explode: attribute.attr_type.is_array().then_some(true),
                schema: schema_for(&attribute.attr_type),
                example: attribute.example.as_ref().map(|e| e.resolve(locale).clone()),
            }
        })
        .collect()
}

/// JSON schema of an attribute type.
pub fn schema_for(attr_type: &AttributeType) -> Schema {
    match attr_type {
        AttributeType::Primitive(primitive) => primitive_schema(*primitive),
        AttributeType::Array(element) => Schema {
            schema_type: Some("array".into()),
            items: Some(Box::new(schema_for(element))),
            ..Schema::default()
        },
        AttributeType::Object(fields) => Schema {
            schema_type: Some("object".into()),
            properties: fields
                .iter()
                .map(|f| (f.name.clone(), schema_for(&f.attr_type)))
                .collect(),
            required: fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name.clone())
                .collect(),
            ..Schema::default()
        },
    }
}

fn primitive_schema(primitive: Primitive) -> Schema {
    let (schema_type, format) = match primitive {
        Primitive::String => ("string", None),
        Primitive::Bytes => ("string", Some("byte")),
        Primitive::Boolean => ("boolean", None),
        Primitive::Int | Primitive::UInt => ("integer", None),
        Primitive::Int32 | Primitive::UInt32 => ("integer", Some("int32")),
        Primitive::Int64 | Primitive::UInt64 => ("integer", Some("int64")),
        Primitive::Float32 => ("number", Some("float")),
        Primitive::Float64 => ("number", Some("double")),
        // Any value: empty schema
        Primitive::Any => return Schema::default(),
    };
    Schema {
        schema_type: Some(schema_type.to_string()),
        format: format.map(str::to_string),
        ..Schema::default()
    }
}
