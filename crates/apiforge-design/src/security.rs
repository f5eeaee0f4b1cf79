//! Security schemes and the requirements attached to API, service and
//! method scopes.

use serde::{Deserialize, Serialize};

use crate::error::DesignError;
use crate::localized::Localized;

/// Description given to scheme scopes declared without one.
pub const DEFAULT_SCOPE_DESCRIPTION: &str = "no description";

/// Authentication mechanism of a security scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeKind {
    #[serde(rename = "basic")]
    BasicAuth,
    #[serde(rename = "apikey")]
    ApiKey,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "jwt")]
    Jwt,
    /// Marker kind carried by the no-auth sentinel.
    #[serde(rename = "none")]
    NoAuth,
}

impl SchemeKind {
    /// Name of the DSL declaration defining a scheme of this kind.
    pub fn dsl_name(self) -> &'static str {
        match self {
            SchemeKind::BasicAuth => "BasicAuthSecurity",
            SchemeKind::ApiKey => "APIKeySecurity",
            SchemeKind::OAuth2 => "OAuth2Security",
            SchemeKind::Jwt => "JWTSecurity",
            SchemeKind::NoAuth => "NoSecurity",
        }
    }
}

/// OAuth2 grant flow (RFC 6749 section 1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowKind {
    AuthorizationCode,
    Implicit,
    Password,
    ClientCredentials,
}

/// An OAuth2 flow and the endpoints its grant type uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub kind: FlowKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
}

impl Flow {
    /// Section 1.3.1: authorization, token and refresh URLs.
    pub fn authorization_code(
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
        refresh_url: impl Into<String>,
    ) -> Self {
        Self {
            kind: FlowKind::AuthorizationCode,
            authorization_url: Some(authorization_url.into()),
            token_url: Some(token_url.into()),
            refresh_url: non_empty(refresh_url.into()),
        }
    }

    /// Section 1.3.2: authorization and refresh URLs.
    pub fn implicit(authorization_url: impl Into<String>, refresh_url: impl Into<String>) -> Self {
        Self {
            kind: FlowKind::Implicit,
            authorization_url: Some(authorization_url.into()),
            token_url: None,
            refresh_url: non_empty(refresh_url.into()),
        }
    }

    /// Section 1.3.3: token and refresh URLs.
    pub fn password(token_url: impl Into<String>, refresh_url: impl Into<String>) -> Self {
        Self {
            kind: FlowKind::Password,
            authorization_url: None,
            token_url: Some(token_url.into()),
            refresh_url: non_empty(refresh_url.into()),
        }
    }

    /// Section 1.3.4: token and refresh URLs.
    pub fn client_credentials(token_url: impl Into<String>, refresh_url: impl Into<String>) -> Self {
        Self {
            kind: FlowKind::ClientCredentials,
            authorization_url: None,
            token_url: Some(token_url.into()),
            refresh_url: non_empty(refresh_url.into()),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// A scope a scheme supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    pub description: String,
}

/// A named authentication scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityScheme {
    pub kind: SchemeKind,
    pub name: String,
    pub description: Option<Localized<String>>,
    /// Scopes, only meaningful for OAuth2 and JWT.
    pub scopes: Vec<Scope>,
    /// Flows, OAuth2 only.
    pub flows: Vec<Flow>,
}

impl SecurityScheme {
    pub fn new(kind: SchemeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: None,
            scopes: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.name == name)
    }
}

/// Handle to a scheme registered in a [`SchemeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeHandle(usize);

/// Reference to a scheme from a security requirement: by name or by handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeRef<'a> {
    Name(&'a str),
    Handle(SchemeHandle),
}

impl<'a> From<&'a str> for SchemeRef<'a> {
    fn from(name: &'a str) -> Self {
        SchemeRef::Name(name)
    }
}

impl From<SchemeHandle> for SchemeRef<'_> {
    fn from(handle: SchemeHandle) -> Self {
        SchemeRef::Handle(handle)
    }
}

/// Registered security schemes, in definition order. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemeRegistry {
    schemes: Vec<SecurityScheme>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scheme. Fails without modifying the registry when the name
    /// is already taken.
    pub fn register(&mut self, scheme: SecurityScheme) -> Result<SchemeHandle, DesignError> {
        if self.contains(&scheme.name) {
            return Err(DesignError::DuplicateScheme(scheme.name));
        }
        self.schemes.push(scheme);
        Ok(SchemeHandle(self.schemes.len() - 1))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&SecurityScheme> {
        self.schemes.iter().find(|s| s.name == name)
    }

    /// Resolve a scheme reference.
    pub fn resolve(&self, scheme: SchemeRef<'_>) -> Result<&SecurityScheme, DesignError> {
        match scheme {
            SchemeRef::Name(name) => self
                .get(name)
                .ok_or_else(|| DesignError::UnknownScheme(name.to_string())),
            SchemeRef::Handle(SchemeHandle(index)) => self
                .schemes
                .get(index)
                .ok_or_else(|| DesignError::UnknownScheme(format!("#{}", index))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecurityScheme> {
        self.schemes.iter()
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

/// One `Security(...)` declaration: every listed scheme must be satisfied,
/// with the listed scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Scheme names, in declaration order.
    pub schemes: Vec<String>,
    /// Required scopes, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// A method-level security declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSecurity {
    Require(Requirement),
    /// `NoSecurity()`: drop inherited requirements for the method.
    NoSecurity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequirement {
    pub service: String,
    pub requirement: Requirement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRequirement {
    pub service: String,
    pub method: String,
    pub security: MethodSecurity,
}

/// Security declarations of a design, one ordered list per scope kind.
///
/// Declarations at the same scope are alternatives: a client satisfying any
/// one of them is authorized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRequirements {
    pub api: Vec<Requirement>,
    pub services: Vec<ServiceRequirement>,
    pub methods: Vec<MethodRequirement>,
}

impl SecurityRequirements {
    pub fn for_api(&self) -> &[Requirement] {
        &self.api
    }

    /// Default requirements of `service`, in declaration order.
    pub fn for_service(&self, service: &str) -> Vec<&Requirement> {
        self.services
            .iter()
            .filter(|r| r.service == service)
            .map(|r| &r.requirement)
            .collect()
    }

    /// Declarations on `service#method`, in declaration order.
    pub fn for_method(&self, service: &str, method: &str) -> Vec<&MethodSecurity> {
        self.methods
            .iter()
            .filter(|r| r.service == service && r.method == method)
            .map(|r| &r.security)
            .collect()
    }

    /// Every requirement of every scope.
    pub fn all(&self) -> impl Iterator<Item = &Requirement> {
        let methods = self.methods.iter().filter_map(|r| match &r.security {
            MethodSecurity::Require(req) => Some(req),
            MethodSecurity::NoSecurity => None,
        });
        self.api
            .iter()
            .chain(self.services.iter().map(|r| &r.requirement))
            .chain(methods)
    }
}
