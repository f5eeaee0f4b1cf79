//! Explicit-context design builder.
//!
//! Every declaration names the node it configures, either by being called on
//! that node's builder handle or by taking a [`Target`]. Usage errors are
//! returned to the caller immediately and also recorded on the builder, so a
//! design keeps evaluating after a bad declaration and [`DesignBuilder::finish`]
//! reports every problem at once.
//!
//! An error returned from a builder closure aborts the enclosing declaration.
//! Errors created by handle methods are recorded where they occur and are not
//! recorded twice when the closure propagates them with `?`.

use std::fmt;

use tracing::debug;

use crate::error::{DesignError, DesignErrors};
use crate::localized::Localized;
use crate::model::{
    Api, Attribute, Contact, Design, HttpVerb, License, Method, Payload, Route, SecurityRole,
    Server, Service, UserType,
};
use crate::path::validate_path_template;
use crate::security::{
    Flow, MethodRequirement, MethodSecurity, Requirement, SchemeHandle, SchemeKind, SchemeRef,
    SchemeRegistry, Scope, SecurityRequirements, SecurityScheme, ServiceRequirement,
    DEFAULT_SCOPE_DESCRIPTION,
};

/// The node a declaration applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Top level of the design, outside any node.
    Top,
    Api,
    Service(&'a str),
    Method { service: &'a str, method: &'a str },
    Type(&'a str),
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Top => f.write_str("top level"),
            Target::Api => f.write_str("API"),
            Target::Service(name) => write!(f, "service \"{}\"", name),
            Target::Method { service, method } => write!(f, "method \"{}#{}\"", service, method),
            Target::Type(name) => write!(f, "type \"{}\"", name),
        }
    }
}

/// The node a `Scope` declaration applies to.
///
/// In a scheme, `Scope` defines a scope the scheme supports. In a security
/// requirement it lists a scope the requirement needs, which one of the
/// requirement's schemes must define.
pub enum ScopeTarget<'a> {
    Scheme(&'a mut SecurityScheme),
    Requirement {
        requirement: &'a mut Requirement,
        schemes: &'a [&'a SecurityScheme],
    },
}

/// Apply a `Scope(name, descriptions...)` declaration.
pub fn add_scope(
    target: ScopeTarget<'_>,
    name: &str,
    descriptions: &[&str],
) -> Result<(), DesignError> {
    match target {
        ScopeTarget::Scheme(scheme) => {
            if descriptions.len() > 1 {
                return Err(DesignError::TooManyArguments(format!(
                    "Scope \"{}\" in security scheme \"{}\"",
                    name, scheme.name
                )));
            }
            let description = descriptions
                .first()
                .copied()
                .unwrap_or(DEFAULT_SCOPE_DESCRIPTION);
            scheme.scopes.push(Scope {
                name: name.to_string(),
                description: description.to_string(),
            });
            Ok(())
        }
        ScopeTarget::Requirement {
            requirement,
            schemes,
        } => {
            if !descriptions.is_empty() {
                return Err(DesignError::TooManyArguments(format!(
                    "Scope \"{}\" in security requirement",
                    name
                )));
            }
            if !schemes.iter().any(|s| s.has_scope(name)) {
                let names: Vec<_> = schemes.iter().map(|s| format!("\"{}\"", s.name)).collect();
                return Err(DesignError::UnknownScope {
                    scope: name.to_string(),
                    schemes: names.join(", "),
                });
            }
            requirement.scopes.push(name.to_string());
            Ok(())
        }
    }
}

/// Record `err` and hand it back for returning.
fn report(errors: &mut Vec<DesignError>, err: DesignError) -> DesignError {
    debug!(error = %err, "design error");
    errors.push(err.clone());
    err
}

/// Record an error a builder closure returned unless a handle already did.
fn report_closure_error(
    errors: &mut Vec<DesignError>,
    recorded_before: usize,
    err: DesignError,
) -> DesignError {
    if errors.len() == recorded_before {
        report(errors, err)
    } else {
        err
    }
}

/// Builds a [`Design`].
#[derive(Debug)]
pub struct DesignBuilder {
    api: Api,
    types: Vec<UserType>,
    services: Vec<Service>,
    schemes: SchemeRegistry,
    security: SecurityRequirements,
    errors: Vec<DesignError>,
}

impl DesignBuilder {
    /// Start a design for the API called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api: Api {
                name: name.into(),
                ..Api::default()
            },
            types: Vec::new(),
            services: Vec::new(),
            schemes: SchemeRegistry::new(),
            security: SecurityRequirements::default(),
            errors: Vec::new(),
        }
    }

    /// Configure API metadata.
    pub fn api(&mut self, build: impl FnOnce(&mut ApiBuilder<'_>)) {
        build(&mut ApiBuilder { api: &mut self.api });
    }

    /// Define a security scheme. Schemes may only be defined at the top level.
    pub fn define_scheme<F>(
        &mut self,
        target: Target<'_>,
        kind: SchemeKind,
        name: &str,
        build: F,
    ) -> Result<SchemeHandle, DesignError>
    where
        F: FnOnce(&mut SchemeBuilder<'_>) -> Result<(), DesignError>,
    {
        if target != Target::Top {
            return Err(report(
                &mut self.errors,
                DesignError::IncompatibleContext {
                    dsl: kind.dsl_name(),
                    context: target.to_string(),
                },
            ));
        }
        if kind == SchemeKind::NoAuth {
            return Err(report(
                &mut self.errors,
                DesignError::IncompatibleContext {
                    dsl: kind.dsl_name(),
                    context: format!("security scheme \"{}\"", name),
                },
            ));
        }
        if self.schemes.contains(name) {
            return Err(report(
                &mut self.errors,
                DesignError::DuplicateScheme(name.to_string()),
            ));
        }

        let before = self.errors.len();
        let mut builder = SchemeBuilder {
            scheme: SecurityScheme::new(kind, name),
            errors: &mut self.errors,
        };
        if let Err(err) = build(&mut builder) {
            return Err(report_closure_error(&mut self.errors, before, err));
        }
        let scheme = builder.scheme;
        if scheme.kind == SchemeKind::OAuth2 && scheme.flows.is_empty() {
            return Err(report(
                &mut self.errors,
                DesignError::MissingFlows(name.to_string()),
            ));
        }

        let handle = self
            .schemes
            .register(scheme)
            .map_err(|err| report(&mut self.errors, err))?;
        debug!(scheme = name, kind = ?kind, "security scheme defined");
        Ok(handle)
    }

    /// `BasicAuthSecurity(name, dsl)`.
    pub fn basic_auth_security<F>(&mut self, name: &str, build: F) -> Result<SchemeHandle, DesignError>
    where
        F: FnOnce(&mut SchemeBuilder<'_>) -> Result<(), DesignError>,
    {
        self.define_scheme(Target::Top, SchemeKind::BasicAuth, name, build)
    }

    /// `APIKeySecurity(name, dsl)`.
    pub fn api_key_security<F>(&mut self, name: &str, build: F) -> Result<SchemeHandle, DesignError>
    where
        F: FnOnce(&mut SchemeBuilder<'_>) -> Result<(), DesignError>,
    {
        self.define_scheme(Target::Top, SchemeKind::ApiKey, name, build)
    }

    /// `OAuth2Security(name, dsl)`.
    pub fn oauth2_security<F>(&mut self, name: &str, build: F) -> Result<SchemeHandle, DesignError>
    where
        F: FnOnce(&mut SchemeBuilder<'_>) -> Result<(), DesignError>,
    {
        self.define_scheme(Target::Top, SchemeKind::OAuth2, name, build)
    }

    /// `JWTSecurity(name, dsl)`.
    pub fn jwt_security<F>(&mut self, name: &str, build: F) -> Result<SchemeHandle, DesignError>
    where
        F: FnOnce(&mut SchemeBuilder<'_>) -> Result<(), DesignError>,
    {
        self.define_scheme(Target::Top, SchemeKind::Jwt, name, build)
    }

    /// Declare a named object type usable as payload or result.
    pub fn user_type<F>(&mut self, name: &str, build: F) -> Result<(), DesignError>
    where
        F: FnOnce(&mut AttributesBuilder) -> Result<(), DesignError>,
    {
        if self.types.iter().any(|t| t.name == name) {
            return Err(report(
                &mut self.errors,
                DesignError::DuplicateType(name.to_string()),
            ));
        }

        let before = self.errors.len();
        let mut builder = AttributesBuilder::default();
        if let Err(err) = build(&mut builder) {
            return Err(report_closure_error(&mut self.errors, before, err));
        }
        self.types.push(UserType {
            name: name.to_string(),
            attributes: builder.attributes,
        });
        Ok(())
    }

    /// Declare a service.
    pub fn service<F>(&mut self, name: &str, build: F) -> Result<(), DesignError>
    where
        F: FnOnce(&mut ServiceBuilder<'_>) -> Result<(), DesignError>,
    {
        if self.services.iter().any(|s| s.name == name) {
            return Err(report(
                &mut self.errors,
                DesignError::DuplicateService(name.to_string()),
            ));
        }

        let before = self.errors.len();
        let mut builder = ServiceBuilder {
            service: Service {
                name: name.to_string(),
                description: None,
                methods: Vec::new(),
            },
            types: &self.types,
            errors: &mut self.errors,
        };
        if let Err(err) = build(&mut builder) {
            return Err(report_closure_error(&mut self.errors, before, err));
        }
        let service = builder.service;

        debug!(service = name, methods = service.methods.len(), "service declared");
        self.services.push(service);
        Ok(())
    }

    /// `Security(schemes..., dsl)`: attach a requirement to the API, a
    /// service or a method.
    pub fn security<F>(
        &mut self,
        target: Target<'_>,
        schemes: &[SchemeRef<'_>],
        build: F,
    ) -> Result<(), DesignError>
    where
        F: FnOnce(&mut RequirementBuilder<'_>) -> Result<(), DesignError>,
    {
        if let Err(err) = self.check_security_target(target, "Security") {
            return Err(report(&mut self.errors, err));
        }
        if schemes.is_empty() {
            return Err(report(&mut self.errors, DesignError::EmptyRequirement));
        }

        let mut resolved = Vec::with_capacity(schemes.len());
        for scheme in schemes {
            match self.schemes.resolve(*scheme) {
                Ok(s) => resolved.push(s),
                Err(err) => return Err(report(&mut self.errors, err)),
            }
        }

        let before = self.errors.len();
        let mut builder = RequirementBuilder {
            requirement: Requirement {
                schemes: resolved.iter().map(|s| s.name.clone()).collect(),
                scopes: Vec::new(),
            },
            schemes: &resolved,
            errors: &mut self.errors,
        };
        if let Err(err) = build(&mut builder) {
            return Err(report_closure_error(&mut self.errors, before, err));
        }
        let requirement = builder.requirement;

        debug!(target = %target, schemes = ?requirement.schemes, "security requirement attached");
        match target {
            Target::Api => self.security.api.push(requirement),
            Target::Service(service) => self.security.services.push(ServiceRequirement {
                service: service.to_string(),
                requirement,
            }),
            Target::Method { service, method } => self.security.methods.push(MethodRequirement {
                service: service.to_string(),
                method: method.to_string(),
                security: MethodSecurity::Require(requirement),
            }),
            Target::Top | Target::Type(_) => {}
        }
        Ok(())
    }

    /// `NoSecurity()`: remove inherited requirements from a method.
    pub fn no_security(&mut self, target: Target<'_>) -> Result<(), DesignError> {
        let Target::Method { service, method } = target else {
            return Err(report(
                &mut self.errors,
                DesignError::IncompatibleContext {
                    dsl: "NoSecurity",
                    context: target.to_string(),
                },
            ));
        };
        if let Err(err) = self.check_security_target(target, "NoSecurity") {
            return Err(report(&mut self.errors, err));
        }

        self.security.methods.push(MethodRequirement {
            service: service.to_string(),
            method: method.to_string(),
            security: MethodSecurity::NoSecurity,
        });
        Ok(())
    }

    fn check_security_target(&self, target: Target<'_>, dsl: &'static str) -> Result<(), DesignError> {
        match target {
            Target::Api => Ok(()),
            Target::Service(name) => self
                .services
                .iter()
                .any(|s| s.name == name)
                .then_some(())
                .ok_or_else(|| DesignError::UnknownTarget(target.to_string())),
            Target::Method { service, method } => self
                .services
                .iter()
                .find(|s| s.name == service)
                .and_then(|s| s.method(method))
                .map(|_| ())
                .ok_or_else(|| DesignError::UnknownTarget(target.to_string())),
            Target::Top | Target::Type(_) => Err(DesignError::IncompatibleContext {
                dsl,
                context: target.to_string(),
            }),
        }
    }

    /// Usage errors recorded so far.
    pub fn errors(&self) -> &[DesignError] {
        &self.errors
    }

    /// Finalize the design, or return every recorded usage error.
    pub fn finish(self) -> Result<Design, DesignErrors> {
        if !self.errors.is_empty() {
            return Err(DesignErrors(self.errors));
        }
        debug!(
            api = %self.api.name,
            services = self.services.len(),
            schemes = self.schemes.len(),
            "design finalized"
        );
        Ok(Design {
            api: self.api,
            types: self.types,
            services: self.services,
            schemes: self.schemes,
            security: self.security,
        })
    }
}

/// Handle on the API node.
pub struct ApiBuilder<'a> {
    api: &'a mut Api,
}

impl ApiBuilder<'_> {
    pub fn title(&mut self, title: impl Into<Localized<String>>) -> &mut Self {
        self.api.title = Some(title.into());
        self
    }

    pub fn description(&mut self, description: impl Into<Localized<String>>) -> &mut Self {
        self.api.description = Some(description.into());
        self
    }

    pub fn terms_of_service(&mut self, url: impl Into<String>) -> &mut Self {
        self.api.terms_of_service = Some(url.into());
        self
    }

    pub fn contact(&mut self, contact: Contact) -> &mut Self {
        self.api.contact = Some(contact);
        self
    }

    pub fn license(&mut self, license: License) -> &mut Self {
        self.api.license = Some(license);
        self
    }

    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.api.version = Some(version.into());
        self
    }

    pub fn server(&mut self, server: Server) -> &mut Self {
        self.api.servers.push(server);
        self
    }
}

/// Handle on a security scheme being defined.
pub struct SchemeBuilder<'a> {
    scheme: SecurityScheme,
    errors: &'a mut Vec<DesignError>,
}

impl SchemeBuilder<'_> {
    pub fn kind(&self) -> SchemeKind {
        self.scheme.kind
    }

    pub fn description(&mut self, description: impl Into<Localized<String>>) -> &mut Self {
        self.scheme.description = Some(description.into());
        self
    }

    /// Define a scope the scheme supports. At most one description.
    pub fn scope(&mut self, name: &str, descriptions: &[&str]) -> Result<(), DesignError> {
        add_scope(ScopeTarget::Scheme(&mut self.scheme), name, descriptions)
            .map_err(|err| report(self.errors, err))
    }

    /// Declare an OAuth2 flow. Fails on schemes of any other kind.
    pub fn flow(&mut self, flow: Flow) -> Result<(), DesignError> {
        if self.scheme.kind != SchemeKind::OAuth2 {
            return Err(report(
                self.errors,
                DesignError::InvalidSchemeKind(self.scheme.name.clone()),
            ));
        }
        self.scheme.flows.push(flow);
        Ok(())
    }

    pub fn authorization_code_flow(
        &mut self,
        authorization_url: &str,
        token_url: &str,
        refresh_url: &str,
    ) -> Result<(), DesignError> {
        self.flow(Flow::authorization_code(
            authorization_url,
            token_url,
            refresh_url,
        ))
    }

    pub fn implicit_flow(&mut self, authorization_url: &str, refresh_url: &str) -> Result<(), DesignError> {
        self.flow(Flow::implicit(authorization_url, refresh_url))
    }

    pub fn password_flow(&mut self, token_url: &str, refresh_url: &str) -> Result<(), DesignError> {
        self.flow(Flow::password(token_url, refresh_url))
    }

    pub fn client_credentials_flow(&mut self, token_url: &str, refresh_url: &str) -> Result<(), DesignError> {
        self.flow(Flow::client_credentials(token_url, refresh_url))
    }
}

/// Handle on a security requirement being declared.
pub struct RequirementBuilder<'a> {
    requirement: Requirement,
    schemes: &'a [&'a SecurityScheme],
    errors: &'a mut Vec<DesignError>,
}

impl RequirementBuilder<'_> {
    /// Require a scope one of the requirement's schemes defines.
    pub fn scope(&mut self, name: &str) -> Result<(), DesignError> {
        self.scope_with(name, &[])
    }

    /// `Scope(name, descriptions...)` as written; descriptions are rejected.
    pub fn scope_with(&mut self, name: &str, descriptions: &[&str]) -> Result<(), DesignError> {
        let target = ScopeTarget::Requirement {
            requirement: &mut self.requirement,
            schemes: self.schemes,
        };
        add_scope(target, name, descriptions).map_err(|err| report(self.errors, err))
    }
}

/// Collects attributes of a type or payload.
#[derive(Debug, Default)]
pub struct AttributesBuilder {
    attributes: Vec<Attribute>,
}

impl AttributesBuilder {
    pub fn attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    /// Attribute holding the basic auth username.
    pub fn username(&mut self, attribute: Attribute) -> &mut Self {
        self.attribute(attribute.with_security_role(SecurityRole::Username))
    }

    /// Attribute holding the basic auth password.
    pub fn password(&mut self, attribute: Attribute) -> &mut Self {
        self.attribute(attribute.with_security_role(SecurityRole::Password))
    }

    /// Attribute holding the key of the API key scheme `scheme`.
    pub fn api_key(&mut self, scheme: &str, attribute: Attribute) -> &mut Self {
        self.attribute(attribute.with_security_role(SecurityRole::ApiKey {
            scheme: scheme.to_string(),
        }))
    }

    /// Attribute holding an OAuth2 access token.
    pub fn access_token(&mut self, attribute: Attribute) -> &mut Self {
        self.attribute(attribute.with_security_role(SecurityRole::AccessToken))
    }

    /// Attribute holding a JWT.
    pub fn token(&mut self, attribute: Attribute) -> &mut Self {
        self.attribute(attribute.with_security_role(SecurityRole::Token))
    }

    /// Mark already declared attributes as required.
    pub fn required(&mut self, names: &[&str]) -> &mut Self {
        for attribute in &mut self.attributes {
            if names.contains(&attribute.name.as_str()) {
                attribute.required = true;
            }
        }
        self
    }
}

/// Handle on a service being declared.
pub struct ServiceBuilder<'a> {
    service: Service,
    types: &'a [UserType],
    errors: &'a mut Vec<DesignError>,
}

impl ServiceBuilder<'_> {
    pub fn description(&mut self, description: impl Into<Localized<String>>) -> &mut Self {
        self.service.description = Some(description.into());
        self
    }

    /// Declare a method. Names are unique within the service.
    pub fn method<F>(&mut self, name: &str, build: F) -> Result<(), DesignError>
    where
        F: FnOnce(&mut MethodBuilder<'_>) -> Result<(), DesignError>,
    {
        if self.service.method(name).is_some() {
            return Err(report(
                self.errors,
                DesignError::DuplicateMethod {
                    service: self.service.name.clone(),
                    method: name.to_string(),
                },
            ));
        }

        let before = self.errors.len();
        let mut builder = MethodBuilder {
            method: Method {
                name: name.to_string(),
                description: None,
                payload: None,
                result: None,
                routes: Vec::new(),
            },
            types: self.types,
            errors: self.errors,
        };
        if let Err(err) = build(&mut builder) {
            return Err(report_closure_error(self.errors, before, err));
        }
        let method = builder.method;
        self.service.methods.push(method);
        Ok(())
    }
}

/// Handle on a method being declared.
pub struct MethodBuilder<'a> {
    method: Method,
    types: &'a [UserType],
    errors: &'a mut Vec<DesignError>,
}

impl MethodBuilder<'_> {
    pub fn description(&mut self, description: impl Into<Localized<String>>) -> &mut Self {
        self.method.description = Some(description.into());
        self
    }

    /// Inline payload attributes.
    pub fn payload(&mut self, build: impl FnOnce(&mut AttributesBuilder)) -> &mut Self {
        self.method.payload = Some(inline_payload(build));
        self
    }

    /// Payload of a declared user type.
    pub fn payload_type(&mut self, name: &str) -> Result<(), DesignError> {
        let payload = self.named_payload(name)?;
        self.method.payload = Some(payload);
        Ok(())
    }

    /// Inline result attributes.
    pub fn result(&mut self, build: impl FnOnce(&mut AttributesBuilder)) -> &mut Self {
        self.method.result = Some(inline_payload(build));
        self
    }

    /// Result of a declared user type.
    pub fn result_type(&mut self, name: &str) -> Result<(), DesignError> {
        let result = self.named_payload(name)?;
        self.method.result = Some(result);
        Ok(())
    }

    /// Bind the method to `verb` at `path`.
    pub fn route(&mut self, verb: HttpVerb, path: &str) -> Result<(), DesignError> {
        validate_path_template(path).map_err(|err| report(self.errors, err))?;
        self.method.routes.push(Route {
            verb,
            path: path.to_string(),
        });
        Ok(())
    }

    pub fn get(&mut self, path: &str) -> Result<(), DesignError> {
        self.route(HttpVerb::Get, path)
    }

    pub fn post(&mut self, path: &str) -> Result<(), DesignError> {
        self.route(HttpVerb::Post, path)
    }

    pub fn put(&mut self, path: &str) -> Result<(), DesignError> {
        self.route(HttpVerb::Put, path)
    }

    pub fn patch(&mut self, path: &str) -> Result<(), DesignError> {
        self.route(HttpVerb::Patch, path)
    }

    pub fn delete(&mut self, path: &str) -> Result<(), DesignError> {
        self.route(HttpVerb::Delete, path)
    }

    fn named_payload(&mut self, name: &str) -> Result<Payload, DesignError> {
        let user_type = self
            .types
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| report(self.errors, DesignError::UnknownType(name.to_string())))?;
        Ok(Payload {
            type_name: Some(user_type.name.clone()),
            attributes: user_type.attributes.clone(),
        })
    }
}

fn inline_payload(build: impl FnOnce(&mut AttributesBuilder)) -> Payload {
    let mut builder = AttributesBuilder::default();
    build(&mut builder);
    Payload {
        type_name: None,
        attributes: builder.attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Primitive;

    fn calc_design() -> DesignBuilder {
        let mut design = DesignBuilder::new("calc");
        design
            .service("calc", |s| {
                s.method("add", |m| {
                    m.payload(|p| {
                        p.attribute(Attribute::new("x", Primitive::Int).required())
                            .attribute(Attribute::new("y", Primitive::Int));
                    });
                    m.get("/add/{x}")
                })?;
                s.method("health", |m| m.get("/health"))
            })
            .unwrap();
        design
    }

    #[test]
    fn build_minimal_design() {
        let design = calc_design().finish().unwrap();
        assert_eq!(design.api.name, "calc");
        let service = design.service("calc").unwrap();
        assert_eq!(service.methods.len(), 2);
        assert_eq!(service.method("add").unwrap().payload_attributes().len(), 2);
        assert_eq!(design.routes().count(), 2);
    }

    #[test]
    fn duplicate_scheme_is_rejected_and_not_registered() {
        let mut design = DesignBuilder::new("api");
        design.basic_auth_security("basic", |_| Ok(())).unwrap();

        let err = design.jwt_security("basic", |_| Ok(())).unwrap_err();

        assert_eq!(err, DesignError::DuplicateScheme("basic".into()));
        assert_eq!(design.errors(), &[err.clone()]);
        let errors = design.finish().unwrap_err();
        assert_eq!(errors.0, vec![err]);
    }

    #[test]
    fn scheme_outside_top_level_is_incompatible() {
        let mut design = calc_design();
        let err = design
            .define_scheme(Target::Service("calc"), SchemeKind::Jwt, "jwt", |_| Ok(()))
            .unwrap_err();
        assert!(matches!(
            err,
            DesignError::IncompatibleContext {
                dsl: "JWTSecurity",
                ..
            }
        ));
    }

    #[test]
    fn flow_on_non_oauth2_scheme_fails() {
        let mut design = DesignBuilder::new("api");
        let err = design
            .jwt_security("jwt", |s| s.implicit_flow("/authorize", ""))
            .unwrap_err();
        assert_eq!(err, DesignError::InvalidSchemeKind("jwt".into()));
        // Reported once even though the closure propagated it.
        assert_eq!(design.errors().len(), 1);
    }

    #[test]
    fn scheme_scopes_default_description() {
        let mut design = DesignBuilder::new("api");
        design
            .oauth2_security("oauth2", |s| {
                s.authorization_code_flow("/authorize", "/token", "/refresh")?;
                s.scope("api:read", &[])?;
                s.scope("api:write", &["Write access"])
            })
            .unwrap();

        let design = design.finish().unwrap();
        let scheme = design.schemes.get("oauth2").unwrap();
        assert_eq!(scheme.scopes[0].description, DEFAULT_SCOPE_DESCRIPTION);
        assert_eq!(scheme.scopes[1].description, "Write access");
        assert_eq!(scheme.flows.len(), 1);
    }

    #[test]
    fn oauth2_scheme_without_flows_is_usage_error() {
        let mut design = DesignBuilder::new("api");
        let err = design
            .oauth2_security("oauth2", |s| s.scope("api:read", &[]))
            .unwrap_err();
        assert_eq!(err, DesignError::MissingFlows("oauth2".into()));
        assert_eq!(err.code(), "E2015");

        // Not registered, so a later definition is not a duplicate
        design
            .oauth2_security("oauth2", |s| s.password_flow("/token", ""))
            .unwrap();
        assert_eq!(design.finish().unwrap_err().0, vec![err]);
    }

    #[test]
    fn scheme_scope_with_two_descriptions_is_usage_error() {
        let mut design = DesignBuilder::new("api");
        let err = design
            .jwt_security("jwt", |s| s.scope("api:read", &["one", "two"]))
            .unwrap_err();
        assert!(matches!(err, DesignError::TooManyArguments(_)));
        assert!(design.finish().unwrap_err().len() == 1);
    }

    #[test]
    fn requirement_scope_must_be_defined() {
        let mut design = calc_design();
        let jwt = design
            .jwt_security("jwt", |s| s.scope("api:read", &["Read"]))
            .unwrap();

        design
            .security(Target::Api, &[jwt.into()], |r| r.scope("api:read"))
            .unwrap();
        let err = design
            .security(Target::Service("calc"), &["jwt".into()], |r| {
                r.scope("api:write")
            })
            .unwrap_err();
        assert!(matches!(err, DesignError::UnknownScope { .. }));

        let err = design
            .security(Target::Api, &["jwt".into()], |r| {
                r.scope_with("api:read", &["desc"])
            })
            .unwrap_err();
        assert!(matches!(err, DesignError::TooManyArguments(_)));
        assert_eq!(design.errors().len(), 2);
    }

    #[test]
    fn security_by_unknown_name_fails() {
        let mut design = calc_design();
        let err = design
            .security(Target::Api, &["missing".into()], |_| Ok(()))
            .unwrap_err();
        assert_eq!(err, DesignError::UnknownScheme("missing".into()));
    }

    #[test]
    fn security_lands_in_scope_lists() {
        let mut design = calc_design();
        design.basic_auth_security("basic", |_| Ok(())).unwrap();
        design
            .security(Target::Api, &["basic".into()], |_| Ok(()))
            .unwrap();
        design
            .security(Target::Service("calc"), &["basic".into()], |_| Ok(()))
            .unwrap();
        design
            .no_security(Target::Method {
                service: "calc",
                method: "health",
            })
            .unwrap();

        let design = design.finish().unwrap();
        assert_eq!(design.security.api.len(), 1);
        assert_eq!(design.security.services.len(), 1);
        assert_eq!(
            design.security.methods[0].security,
            MethodSecurity::NoSecurity
        );
    }

    #[test]
    fn no_security_only_at_method_scope() {
        let mut design = calc_design();
        let err = design.no_security(Target::Service("calc")).unwrap_err();
        assert!(matches!(
            err,
            DesignError::IncompatibleContext {
                dsl: "NoSecurity",
                ..
            }
        ));
        let err = design.no_security(Target::Api).unwrap_err();
        assert!(matches!(err, DesignError::IncompatibleContext { .. }));
    }

    #[test]
    fn security_on_unknown_method_fails() {
        let mut design = calc_design();
        design.basic_auth_security("basic", |_| Ok(())).unwrap();
        let err = design
            .security(
                Target::Method {
                    service: "calc",
                    method: "sub",
                },
                &["basic".into()],
                |_| Ok(()),
            )
            .unwrap_err();
        assert!(matches!(err, DesignError::UnknownTarget(_)));
    }

    #[test]
    fn errors_accumulate_across_declarations() {
        let mut design = DesignBuilder::new("api");
        let _ = design.service("svc", |s| {
            s.method("bad", |m| m.get("/items/{id"))?;
            Ok(())
        });
        let _ = design.service("svc2", |s| {
            s.method("typed", |m| m.payload_type("Missing"))
        });
        let _ = design.basic_auth_security("basic", |_| Ok(()));
        let _ = design.basic_auth_security("basic", |_| Ok(()));

        let errors = design.finish().unwrap_err();
        assert_eq!(errors.len(), 3);
        let errors: Vec<_> = errors.iter().cloned().collect();
        assert!(matches!(errors[0], DesignError::InvalidPathTemplate(_)));
        assert_eq!(errors[1], DesignError::UnknownType("Missing".into()));
        assert_eq!(errors[2], DesignError::DuplicateScheme("basic".into()));
    }

    #[test]
    fn duplicate_method_and_service() {
        let mut design = calc_design();
        let err = design.service("calc", |_| Ok(())).unwrap_err();
        assert_eq!(err, DesignError::DuplicateService("calc".into()));

        let err = design
            .service("other", |s| {
                s.method("m", |_| Ok(()))?;
                s.method("m", |_| Ok(()))
            })
            .unwrap_err();
        assert!(matches!(err, DesignError::DuplicateMethod { .. }));
    }

    #[test]
    fn payload_type_copies_attributes_and_roles() {
        let mut design = DesignBuilder::new("api");
        design
            .user_type("Credentials", |t| {
                t.username(Attribute::new("user", Primitive::String))
                    .password(Attribute::new("pass", Primitive::String))
                    .attribute(Attribute::new("remember", Primitive::Boolean))
                    .required(&["user", "pass"]);
                Ok(())
            })
            .unwrap();
        design
            .service("auth", |s| {
                s.method("login", |m| {
                    m.payload_type("Credentials")?;
                    m.post("/login")
                })
            })
            .unwrap();

        let design = design.finish().unwrap();
        let method = design.service("auth").unwrap().method("login").unwrap();
        let payload = method.payload.as_ref().unwrap();
        assert_eq!(payload.type_name.as_deref(), Some("Credentials"));
        assert_eq!(
            payload.attributes[0].security_role,
            Some(SecurityRole::Username)
        );
        assert!(payload.attributes[1].required);
        assert!(!payload.attributes[2].required);
    }
}
