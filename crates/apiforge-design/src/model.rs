use std::fmt;

use serde::{Deserialize, Serialize};

use crate::localized::Localized;
use crate::security::{SchemeRegistry, SecurityRequirements};

/// A finalized design graph.
///
/// Produced by [`DesignBuilder::finish`](crate::DesignBuilder::finish) and
/// read-only from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub api: Api,
    /// User types, in declaration order.
    pub types: Vec<UserType>,
    /// Services, in declaration order.
    pub services: Vec<Service>,
    pub schemes: SchemeRegistry,
    pub security: SecurityRequirements,
}

impl Design {
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn user_type(&self, name: &str) -> Option<&UserType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Every route of every method, in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = RouteRef<'_>> {
        self.services.iter().flat_map(|service| {
            service.methods.iter().flat_map(move |method| {
                method.routes.iter().map(move |route| RouteRef {
                    service,
                    method,
                    route,
                })
            })
        })
    }

    /// Whether at least one method is reachable over HTTP.
    pub fn has_routes(&self) -> bool {
        self.routes().next().is_some()
    }
}

/// A route together with the method and service that own it.
#[derive(Debug, Clone, Copy)]
pub struct RouteRef<'a> {
    pub service: &'a Service,
    pub method: &'a Method,
    pub route: &'a Route,
}

/// The API node. Exactly one per design.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Api {
    pub name: String,
    pub title: Option<Localized<String>>,
    pub description: Option<Localized<String>>,
    pub terms_of_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub version: Option<String>,
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    #[serde(default)]
    pub description: Option<Localized<String>>,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub description: Option<Localized<String>>,
    /// URI templates the host is reachable at.
    #[serde(default)]
    pub uris: Vec<String>,
}

/// A named object type.
#[derive(Debug, Clone, PartialEq)]
pub struct UserType {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

/// Primitive attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    String,
    Bytes,
    Boolean,
    Int,
    Int32,
    Int64,
    UInt,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Any,
}

impl Primitive {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" => Some(Self::String),
            "bytes" => Some(Self::Bytes),
            "boolean" | "bool" => Some(Self::Boolean),
            "int" => Some(Self::Int),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "uint" => Some(Self::UInt),
            "uint32" => Some(Self::UInt32),
            "uint64" => Some(Self::UInt64),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            "any" => Some(Self::Any),
            _ => None,
        }
    }
}

/// Type of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    Primitive(Primitive),
    Array(Box<AttributeType>),
    Object(Vec<Attribute>),
}

impl AttributeType {
    pub fn is_array(&self) -> bool {
        matches!(self, AttributeType::Array(_))
    }
}

impl From<Primitive> for AttributeType {
    fn from(p: Primitive) -> Self {
        AttributeType::Primitive(p)
    }
}

/// Tag placed on attributes declared through the security DSL.
///
/// Tagged attributes carry credentials and are rendered as part of the
/// authorization mechanism instead of as request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecurityRole {
    Username,
    Password,
    /// API key for the named scheme.
    ApiKey {
        scheme: String,
    },
    AccessToken,
    Token,
}

impl fmt::Display for SecurityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityRole::Username => f.write_str("security:username"),
            SecurityRole::Password => f.write_str("security:password"),
            SecurityRole::ApiKey { scheme } => write!(f, "security:apikey:{}", scheme),
            SecurityRole::AccessToken => f.write_str("security:accesstoken"),
            SecurityRole::Token => f.write_str("security:token"),
        }
    }
}

/// A field of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub description: Option<Localized<String>>,
    pub example: Option<Localized<serde_json::Value>>,
    pub security_role: Option<SecurityRole>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<AttributeType>) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
            required: false,
            description: None,
            example: None,
            security_role: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<Localized<String>>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_example(mut self, example: Localized<serde_json::Value>) -> Self {
        self.example = Some(example);
        self
    }

    pub fn with_security_role(mut self, role: SecurityRole) -> Self {
        self.security_role = Some(role);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub description: Option<Localized<String>>,
    pub methods: Vec<Method>,
}

impl Service {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Payload or result of a method: a named user type or inline attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Name of the user type, `None` when declared inline.
    pub type_name: Option<String>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub description: Option<Localized<String>>,
    pub payload: Option<Payload>,
    pub result: Option<Payload>,
    pub routes: Vec<Route>,
}

impl Method {
    /// Payload attributes, empty when the method takes no payload.
    pub fn payload_attributes(&self) -> &[Attribute] {
        self.payload
            .as_ref()
            .map(|p| p.attributes.as_slice())
            .unwrap_or_default()
    }
}

/// HTTP verbs a route can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Post => "POST",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (verb, path template) pair bound to a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub verb: HttpVerb,
    pub path: String,
}
