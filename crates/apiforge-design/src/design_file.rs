//! Design files.
//!
//! A design file is a YAML (or JSON) rendition of the builder declarations.
//! Loading replays it through a [`DesignBuilder`], so a file with several
//! mistakes reports all of them at once.
//!
//! ```yaml
//! api:
//!   name: calc
//!   version: "1.0"
//! schemes:
//!   - kind: jwt
//!     name: jwt
//!     scopes:
//!       - name: "calc:read"
//! services:
//!   - name: calc
//!     security:
//!       - schemes: [jwt]
//!         scopes: ["calc:read"]
//!     methods:
//!       - name: add
//!         payload:
//!           attributes:
//!             - { name: x, type: int, required: true }
//!             - { name: y, type: int }
//!         routes:
//!           - { verb: GET, path: "/add/{x}" }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::builder::{AttributesBuilder, DesignBuilder, MethodBuilder, Target};
use crate::error::{DesignError, DesignErrors};
use crate::localized::Localized;
use crate::model::{
    Attribute, AttributeType, Contact, Design, HttpVerb, License, Primitive, SecurityRole, Server,
};
use crate::security::{Flow, FlowKind, SchemeKind, SchemeRef};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DesignFile {
    api: ApiFile,
    #[serde(default)]
    schemes: Vec<SchemeFile>,
    #[serde(default)]
    types: Vec<TypeFile>,
    #[serde(default)]
    services: Vec<ServiceFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ApiFile {
    name: String,
    #[serde(default)]
    title: Option<Localized<String>>,
    #[serde(default)]
    description: Option<Localized<String>>,
    #[serde(default)]
    terms_of_service: Option<String>,
    #[serde(default)]
    contact: Option<Contact>,
    #[serde(default)]
    license: Option<License>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    servers: Vec<Server>,
    #[serde(default)]
    security: Vec<RequirementFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SchemeFile {
    kind: SchemeKind,
    name: String,
    #[serde(default)]
    description: Option<Localized<String>>,
    #[serde(default)]
    scopes: Vec<ScopeFile>,
    #[serde(default)]
    flows: Vec<FlowFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScopeFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FlowFile {
    kind: FlowKind,
    #[serde(default)]
    authorization_url: String,
    #[serde(default)]
    token_url: String,
    #[serde(default)]
    refresh_url: String,
}

impl FlowFile {
    fn to_flow(&self) -> Flow {
        match self.kind {
            FlowKind::AuthorizationCode => Flow::authorization_code(
                &self.authorization_url,
                &self.token_url,
                &self.refresh_url,
            ),
            FlowKind::Implicit => Flow::implicit(&self.authorization_url, &self.refresh_url),
            FlowKind::Password => Flow::password(&self.token_url, &self.refresh_url),
            FlowKind::ClientCredentials => {
                Flow::client_credentials(&self.token_url, &self.refresh_url)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeFile {
    name: String,
    #[serde(default)]
    attributes: Vec<AttributeFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeFile {
    name: String,
    #[serde(rename = "type")]
    attr_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<Localized<String>>,
    #[serde(default)]
    example: Option<Localized<Value>>,
    /// Security role: username, password, apiKey, accessToken or token.
    #[serde(default)]
    role: Option<String>,
    /// Scheme the `apiKey` role belongs to.
    #[serde(default)]
    scheme: Option<String>,
    /// Fields of an `object` attribute.
    #[serde(default)]
    attributes: Vec<AttributeFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ServiceFile {
    name: String,
    #[serde(default)]
    description: Option<Localized<String>>,
    #[serde(default)]
    security: Vec<RequirementFile>,
    #[serde(default)]
    methods: Vec<MethodFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MethodFile {
    name: String,
    #[serde(default)]
    description: Option<Localized<String>>,
    #[serde(default)]
    payload: Option<PayloadFile>,
    #[serde(default)]
    result: Option<PayloadFile>,
    #[serde(default)]
    security: Vec<RequirementFile>,
    #[serde(default)]
    no_security: bool,
    #[serde(default)]
    routes: Vec<RouteFile>,
}

/// A payload is either the name of a declared type or inline attributes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PayloadFile {
    Named(String),
    Inline { attributes: Vec<AttributeFile> },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteFile {
    verb: HttpVerb,
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequirementFile {
    schemes: Vec<String>,
    #[serde(default)]
    scopes: Vec<String>,
}

/// Parse and evaluate a design from a YAML/JSON string.
pub fn parse_design(input: &str) -> Result<Design, DesignErrors> {
    // JSON is valid YAML
    let file: DesignFile = serde_yaml::from_str(input)
        .map_err(|e| DesignError::InvalidDesignFile(e.to_string()))?;
    evaluate(file)
}

/// Parse and evaluate a design file from disk.
pub fn parse_design_file(path: &Path) -> Result<Design, DesignErrors> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DesignError::InvalidDesignFile(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "loading design file");
    parse_design(&content)
}

fn evaluate(file: DesignFile) -> Result<Design, DesignErrors> {
    let DesignFile {
        api,
        schemes,
        types,
        services,
    } = file;
    let mut design = DesignBuilder::new(&api.name);

    design.api(|a| {
        if let Some(title) = api.title {
            a.title(title);
        }
        if let Some(description) = api.description {
            a.description(description);
        }
        if let Some(url) = api.terms_of_service {
            a.terms_of_service(url);
        }
        if let Some(contact) = api.contact {
            a.contact(contact);
        }
        if let Some(license) = api.license {
            a.license(license);
        }
        if let Some(version) = api.version {
            a.version(version);
        }
        for server in api.servers {
            a.server(server);
        }
    });

    // Failures are recorded on the builder and reported by finish().
    for scheme in &schemes {
        let _ = design.define_scheme(Target::Top, scheme.kind, &scheme.name, |s| {
            if let Some(description) = &scheme.description {
                s.description(description.clone());
            }
            for scope in &scheme.scopes {
                match &scope.description {
                    Some(description) => s.scope(&scope.name, &[description.as_str()])?,
                    None => s.scope(&scope.name, &[])?,
                }
            }
            for flow in &scheme.flows {
                s.flow(flow.to_flow())?;
            }
            Ok(())
        });
    }

    for user_type in &types {
        let _ = design.user_type(&user_type.name, |t| {
            add_attributes(t, &user_type.attributes)
        });
    }

    let mut declared = Vec::with_capacity(services.len());
    for service in &services {
        let mut methods = Vec::with_capacity(service.methods.len());
        let built = design.service(&service.name, |s| {
            if let Some(description) = &service.description {
                s.description(description.clone());
            }
            for method in &service.methods {
                // Keep going so every bad method is reported.
                if s.method(&method.name, |m| build_method(m, method)).is_ok() {
                    methods.push(method);
                }
            }
            Ok(())
        });
        if built.is_ok() {
            declared.push((service, methods));
        }
    }

    for requirement in &api.security {
        attach(&mut design, Target::Api, requirement);
    }
    // Only declared services and methods carry security.
    for (service, methods) in declared {
        for requirement in &service.security {
            attach(&mut design, Target::Service(&service.name), requirement);
        }
        for method in methods {
            let target = Target::Method {
                service: &service.name,
                method: &method.name,
            };
            for requirement in &method.security {
                attach(&mut design, target, requirement);
            }
            if method.no_security {
                let _ = design.no_security(target);
            }
        }
    }

    design.finish()
}

fn build_method(m: &mut MethodBuilder<'_>, method: &MethodFile) -> Result<(), DesignError> {
    if let Some(description) = &method.description {
        m.description(description.clone());
    }
    match &method.payload {
        Some(PayloadFile::Named(name)) => m.payload_type(name)?,
        Some(PayloadFile::Inline { attributes }) => {
            let attributes = convert_attributes(attributes)?;
            m.payload(|p| {
                for attribute in attributes {
                    p.attribute(attribute);
                }
            });
        }
        None => {}
    }
    match &method.result {
        Some(PayloadFile::Named(name)) => m.result_type(name)?,
        Some(PayloadFile::Inline { attributes }) => {
            let attributes = convert_attributes(attributes)?;
            m.result(|p| {
                for attribute in attributes {
                    p.attribute(attribute);
                }
            });
        }
        None => {}
    }
    for route in &method.routes {
        m.route(route.verb, &route.path)?;
    }
    Ok(())
}

fn attach(design: &mut DesignBuilder, target: Target<'_>, requirement: &RequirementFile) {
    let schemes: Vec<SchemeRef<'_>> = requirement
        .schemes
        .iter()
        .map(|name| SchemeRef::Name(name.as_str()))
        .collect();
    let _ = design.security(target, &schemes, |r| {
        for scope in &requirement.scopes {
            r.scope(scope)?;
        }
        Ok(())
    });
}

fn add_attributes(
    builder: &mut AttributesBuilder,
    attributes: &[AttributeFile],
) -> Result<(), DesignError> {
    for attribute in convert_attributes(attributes)? {
        builder.attribute(attribute);
    }
    Ok(())
}

fn convert_attributes(attributes: &[AttributeFile]) -> Result<Vec<Attribute>, DesignError> {
    attributes.iter().map(convert_attribute).collect()
}

fn convert_attribute(file: &AttributeFile) -> Result<Attribute, DesignError> {
    let attr_type = parse_type(&file.attr_type, &file.attributes)?;
    let mut attribute = Attribute::new(&file.name, attr_type);
    attribute.required = file.required;
    attribute.description = file.description.clone();
    attribute.example = file.example.clone();
    if let Some(role) = &file.role {
        attribute.security_role = Some(parse_role(role, file)?);
    }
    Ok(attribute)
}

/// Parse a type expression: a primitive, `array<T>` or `object`.
fn parse_type(expr: &str, fields: &[AttributeFile]) -> Result<AttributeType, DesignError> {
    let expr = expr.trim();
    if let Some(inner) = expr
        .strip_prefix("array<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return Ok(AttributeType::Array(Box::new(parse_type(inner, fields)?)));
    }
    if expr == "object" {
        return Ok(AttributeType::Object(convert_attributes(fields)?));
    }
    Primitive::parse(expr)
        .map(AttributeType::Primitive)
        .ok_or_else(|| DesignError::UnknownType(expr.to_string()))
}

fn parse_role(role: &str, file: &AttributeFile) -> Result<SecurityRole, DesignError> {
    match role {
        "username" => Ok(SecurityRole::Username),
        "password" => Ok(SecurityRole::Password),
        "accessToken" => Ok(SecurityRole::AccessToken),
        "token" => Ok(SecurityRole::Token),
        "apiKey" => file
            .scheme
            .as_ref()
            .map(|scheme| SecurityRole::ApiKey {
                scheme: scheme.clone(),
            })
            .ok_or_else(|| {
                DesignError::InvalidDesignFile(format!(
                    "attribute \"{}\" has role apiKey but no scheme",
                    file.name
                ))
            }),
        other => Err(DesignError::InvalidDesignFile(format!(
            "unknown security role \"{}\" on attribute \"{}\"",
            other, file.name
        ))),
    }
}
