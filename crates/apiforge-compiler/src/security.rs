//! Effective security of operations and rendering of scheme components.

use std::collections::{BTreeMap, BTreeSet};

use apiforge_design::{
    Design, FlowKind, MethodSecurity, Requirement, SchemeKind, SchemeRegistry, SecurityScheme,
};

use crate::document::{OAuthFlow, OAuthFlows, SecurityRequirementObject, SecuritySchemeObject};
use crate::error::CompileError;

/// Security in effect for a method.
///
/// The most specific non-empty layer wins: method, then service, then API.
/// `NoSecurity` at the method layer is an explicit empty layer that hides
/// every less specific one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveSecurity<'a> {
    /// Nothing declared at any layer.
    Unspecified,
    /// `NoSecurity()` on the method.
    Disabled,
    /// Alternatives, any one of which authorizes the call.
    Required(Vec<&'a Requirement>),
}

pub fn resolve_security<'a>(
    design: &'a Design,
    service: &str,
    method: &str,
) -> EffectiveSecurity<'a> {
    let security = &design.security;

    let mut method_layer = Vec::new();
    for declared in security.for_method(service, method) {
        match declared {
            MethodSecurity::NoSecurity => return EffectiveSecurity::Disabled,
            MethodSecurity::Require(requirement) => method_layer.push(requirement),
        }
    }

    let layers = [
        method_layer,
        security.for_service(service),
        security.for_api().iter().collect(),
    ];
    layers
        .into_iter()
        .find(|layer| !layer.is_empty())
        .map(EffectiveSecurity::Required)
        .unwrap_or(EffectiveSecurity::Unspecified)
}

/// Schemes referenced by operations, with the scopes those operations
/// require from each.
pub type ReferencedSchemes = BTreeMap<String, BTreeSet<String>>;

/// Render the `security` field of an operation, recording every scheme it
/// references in `referenced`.
pub fn render_security(
    effective: &EffectiveSecurity<'_>,
    registry: &SchemeRegistry,
    operation_id: &str,
    referenced: &mut ReferencedSchemes,
) -> Result<Option<Vec<SecurityRequirementObject>>, CompileError> {
    let requirements = match effective {
        EffectiveSecurity::Unspecified => return Ok(None),
        EffectiveSecurity::Disabled => return Ok(Some(Vec::new())),
        EffectiveSecurity::Required(requirements) => requirements,
    };

    let mut rendered = Vec::with_capacity(requirements.len());
    for requirement in requirements {
        let mut object = SecurityRequirementObject::new();
        for name in &requirement.schemes {
            let scheme = registry
                .get(name)
                .ok_or_else(|| CompileError::UnknownScheme {
                    operation: operation_id.to_string(),
                    scheme: name.clone(),
                })?;
            let required = required_scopes(scheme, requirement);
            referenced
                .entry(name.clone())
                .or_default()
                .extend(required.iter().cloned());
            object.insert(name.clone(), requirement_scopes(scheme, required));
        }
        rendered.push(object);
    }
    Ok(Some(rendered))
}

/// Scopes of `requirement` defined by `scheme`.
fn required_scopes(scheme: &SecurityScheme, requirement: &Requirement) -> Vec<String> {
    requirement
        .scopes
        .iter()
        .filter(|scope| scheme.has_scope(scope))
        .cloned()
        .collect()
}

/// Scope list of a requirement object entry. OpenAPI only allows scopes on
/// oauth2 schemes; JWT scopes are listed in the scheme description instead.
fn requirement_scopes(scheme: &SecurityScheme, required: Vec<String>) -> Vec<String> {
    match scheme.kind {
        SchemeKind::OAuth2 => required,
        _ => Vec::new(),
    }
}

/// Render a scheme as a `components.securitySchemes` entry.
///
/// `required` holds the scopes operations require from the scheme.
/// Returns `None` for the no-auth marker kind, which has no OpenAPI form.
pub fn render_scheme(
    scheme: &SecurityScheme,
    required: &BTreeSet<String>,
    locale: &str,
) -> Option<SecuritySchemeObject> {
    let description = scheme
        .description
        .as_ref()
        .map(|d| d.resolve(locale).clone());
    let mut object = SecuritySchemeObject {
        scheme_type: String::new(),
        description,
        scheme: None,
        bearer_format: None,
        location: None,
        name: None,
        flows: None,
    };

    match scheme.kind {
        SchemeKind::BasicAuth => {
            object.scheme_type = "http".into();
            object.scheme = Some("basic".into());
        }
        SchemeKind::Jwt => {
            object.scheme_type = "http".into();
            object.scheme = Some("bearer".into());
            object.bearer_format = Some("JWT".into());
            object.description = jwt_description(object.description.take(), scheme, required);
        }
        SchemeKind::ApiKey => {
            object.scheme_type = "apiKey".into();
            object.location = Some("header".into());
            object.name = Some("Authorization".into());
        }
        SchemeKind::OAuth2 => {
            object.scheme_type = "oauth2".into();
            object.flows = Some(render_flows(scheme));
        }
        SchemeKind::NoAuth => return None,
    }
    Some(object)
}

/// Append the scope definitions and the required scopes of a JWT scheme to
/// its description.
fn jwt_description(
    description: Option<String>,
    scheme: &SecurityScheme,
    required: &BTreeSet<String>,
) -> Option<String> {
    let mut sections: Vec<String> = description.into_iter().collect();
    if !scheme.scopes.is_empty() {
        let mut defined = String::from("**Security Scopes**:");
        for scope in &scheme.scopes {
            defined.push_str(&format!("\n  * `{}`: {}", scope.name, scope.description));
        }
        sections.push(defined);
    }
    if !required.is_empty() {
        let names: Vec<String> = required.iter().map(|s| format!("`{}`", s)).collect();
        sections.push(format!("**Required security scopes**: {}", names.join(", ")));
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

fn render_flows(scheme: &SecurityScheme) -> OAuthFlows {
    let scopes: BTreeMap<String, String> = scheme
        .scopes
        .iter()
        .map(|s| (s.name.clone(), s.description.clone()))
        .collect();

    let mut flows = OAuthFlows::default();
    for flow in &scheme.flows {
        let rendered = OAuthFlow {
            authorization_url: flow.authorization_url.clone(),
            token_url: flow.token_url.clone(),
            refresh_url: flow.refresh_url.clone(),
            scopes: scopes.clone(),
        };
        let slot = match flow.kind {
            FlowKind::AuthorizationCode => &mut flows.authorization_code,
            FlowKind::Implicit => &mut flows.implicit,
            FlowKind::Password => &mut flows.password,
            FlowKind::ClientCredentials => &mut flows.client_credentials,
        };
        *slot = Some(rendered);
    }
    flows
}
