//! Design graph for apiforge.
//!
//! A design describes an HTTP API: services, methods, routes, payload types
//! and the security schemes protecting them. Designs are declared through
//! [`DesignBuilder`] or loaded from a YAML/JSON design file, and are
//! read-only once [`DesignBuilder::finish`] returns.

pub mod builder;
pub mod design_file;
pub mod error;
pub mod localized;
pub mod model;
pub mod path;
pub mod security;

pub use builder::{
    add_scope, ApiBuilder, AttributesBuilder, DesignBuilder, MethodBuilder, RequirementBuilder,
    SchemeBuilder, ScopeTarget, ServiceBuilder, Target,
};
pub use design_file::{parse_design, parse_design_file};
pub use error::{DesignError, DesignErrors};
pub use localized::Localized;
pub use model::{
    Api, Attribute, AttributeType, Contact, Design, Host, HttpVerb, License, Method, Payload,
    Primitive, Route, RouteRef, SecurityRole, Server, Service, UserType,
};
pub use path::{extract_wildcards, validate_path_template};
pub use security::{
    Flow, FlowKind, MethodSecurity, Requirement, SchemeHandle, SchemeKind, SchemeRef,
    SchemeRegistry, Scope, SecurityRequirements, SecurityScheme,
};
