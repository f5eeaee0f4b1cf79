//! Document assembly.
//!
//! Walks services, methods and routes of a design and builds the OpenAPI
//! document for one locale. Assembly is a pure function of the design and
//! the locale.

use std::collections::BTreeMap;

use apiforge_design::{Api, Design, HttpVerb};
use tracing::debug;

use crate::document::{
    Components, ContactInfo, Document, Info, LicenseInfo, Operation, PathItem, ServerEntry,
    OPENAPI_VERSION,
};
use crate::error::CompileError;
use crate::params::classify;
use crate::security::{render_scheme, render_security, resolve_security, ReferencedSchemes};

/// Version reported when the API declares none.
pub const DEFAULT_VERSION: &str = "unversioned";

/// Assemble the document of `design` for `locale`.
///
/// Returns `Ok(None)` when no method is reachable over HTTP.
pub fn assemble(design: &Design, locale: &str) -> Result<Option<Document>, CompileError> {
    if !design.has_routes() {
        debug!(api = %design.api.name, locale, "no HTTP routes, skipping document");
        return Ok(None);
    }

    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
    // (path, verb) -> operation id, for conflict reports
    let mut owners: BTreeMap<(String, HttpVerb), String> = BTreeMap::new();
    let mut referenced = ReferencedSchemes::new();

    for route_ref in design.routes() {
        let service = route_ref.service;
        let method = route_ref.method;
        let route = route_ref.route;
        let operation_id = format!("{}#{}", service.name, method.name);

        let key = (route.path.clone(), route.verb);
        if let Some(first) = owners.get(&key) {
            return Err(CompileError::ConflictingRoute {
                path: route.path.clone(),
                verb: route.verb.to_string(),
                first: first.clone(),
                second: operation_id,
            });
        }

        let effective = resolve_security(design, &service.name, &method.name);
        let security = render_security(&effective, &design.schemes, &operation_id, &mut referenced)?;

        let operation = Operation {
            operation_id: operation_id.clone(),
            description: method
                .description
                .as_ref()
                .map(|d| d.resolve(locale).clone()),
            parameters: classify(method.payload_attributes(), &route.path, locale),
            responses: BTreeMap::new(),
            security,
        };

        *paths
            .entry(route.path.clone())
            .or_default()
            .slot_mut(route.verb) = Some(operation);
        owners.insert(key, operation_id);
    }

    let security_schemes = referenced
        .iter()
        .filter_map(|(name, required)| Some((design.schemes.get(name)?, required)))
        .filter_map(|(scheme, required)| {
            render_scheme(scheme, required, locale).map(|s| (scheme.name.clone(), s))
        })
        .collect();

    debug!(
        api = %design.api.name,
        locale,
        paths = paths.len(),
        operations = owners.len(),
        "document assembled"
    );

    Ok(Some(Document {
        openapi: OPENAPI_VERSION.to_string(),
        info: info(&design.api, locale),
        servers: servers(&design.api, locale),
        paths,
        components: Components { security_schemes },
    }))
}

fn info(api: &Api, locale: &str) -> Info {
    Info {
        title: api
            .title
            .as_ref()
            .map(|t| t.resolve(locale).clone())
            .unwrap_or_else(|| api.name.clone()),
        description: api
            .description
            .as_ref()
            .map(|d| d.resolve(locale).clone()),
        terms_of_service: api.terms_of_service.clone(),
        contact: api.contact.as_ref().map(|c| ContactInfo {
            name: c.name.clone(),
            url: c.url.clone(),
            email: c.email.clone(),
        }),
        license: api.license.as_ref().map(|l| LicenseInfo {
            name: l.name.clone(),
            url: l.url.clone(),
        }),
        version: api
            .version
            .clone()
            .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
    }
}

/// One entry per (host, URI) pair, in declaration order.
fn servers(api: &Api, locale: &str) -> Vec<ServerEntry> {
    api.servers
        .iter()
        .flat_map(|server| &server.hosts)
        .flat_map(|host| {
            let description = host.description.as_ref().map(|d| d.resolve(locale).clone());
            host.uris.iter().map(move |uri| ServerEntry {
                url: uri.clone(),
                description: description.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiforge_design::{
        Attribute, Contact, DesignBuilder, Host, Localized, Primitive, Server, Target,
    };
    use serde_json::json;

    use crate::document::ParameterLocation;

    fn calc() -> DesignBuilder {
        let mut design = DesignBuilder::new("calc");
        design
            .service("calc", |s| {
                s.method("add", |m| {
                    m.description(
                        Localized::new("Add two numbers".to_string())
                            .with_translation("nl", "Tel twee getallen op".to_string()),
                    );
                    m.payload(|p| {
                        p.attribute(Attribute::new("x", Primitive::Int).required())
                            .attribute(Attribute::new("y", Primitive::Int));
                    });
                    m.get("/add/{x}")
                })
            })
            .unwrap();
        design
    }

    #[test]
    fn calc_add_operation() {
        let design = calc().finish().unwrap();
        let doc = assemble(&design, "en").unwrap().unwrap();

        let op = doc.paths["/add/{x}"].operation(HttpVerb::Get).unwrap();
        assert_eq!(op.operation_id, "calc#add");
        assert_eq!(op.description.as_deref(), Some("Add two numbers"));
        let params: Vec<_> = op
            .parameters
            .iter()
            .map(|p| (p.location, p.name.as_str(), p.required))
            .collect();
        assert_eq!(
            params,
            vec![
                (ParameterLocation::Path, "x", true),
                (ParameterLocation::Query, "y", false)
            ]
        );
        assert!(op.security.is_none());
        assert!(doc.components.is_empty());
    }

    #[test]
    fn metadata_defaults() {
        let design = calc().finish().unwrap();
        let doc = assemble(&design, "en").unwrap().unwrap();
        assert_eq!(doc.openapi, "3.0.0");
        assert_eq!(doc.info.title, "calc");
        assert_eq!(doc.info.version, DEFAULT_VERSION);
        assert!(doc.servers.is_empty());
    }

    #[test]
    fn metadata_is_localized() {
        let mut design = calc();
        design.api(|a| {
            a.title(Localized::new("Calculator".to_string()).with_translation("nl", "Rekenmachine".to_string()))
                .version("1.2.0")
                .contact(Contact {
                    name: Some("Team".into()),
                    url: None,
                    email: Some("team@example.com".into()),
                });
        });
        let design = design.finish().unwrap();

        let en = assemble(&design, "en").unwrap().unwrap();
        let nl = assemble(&design, "nl").unwrap().unwrap();
        assert_eq!(en.info.title, "Calculator");
        assert_eq!(nl.info.title, "Rekenmachine");
        assert_eq!(nl.info.version, "1.2.0");
        assert_eq!(
            nl.paths["/add/{x}"].get.as_ref().unwrap().description.as_deref(),
            Some("Tel twee getallen op")
        );
        assert_eq!(
            serde_json::to_value(&en.info.contact).unwrap(),
            json!({"name": "Team", "email": "team@example.com"})
        );
    }

    #[test]
    fn servers_expand_hosts_and_uris() {
        let mut design = calc();
        design.api(|a| {
            a.server(Server {
                name: "calc".into(),
                description: None,
                hosts: vec![
                    Host {
                        name: "dev".into(),
                        description: Some("Development".into()),
                        uris: vec!["http://localhost:8000".into(), "grpc://localhost:8080".into()],
                    },
                    Host {
                        name: "prod".into(),
                        description: None,
                        uris: vec!["https://calc.example.com".into()],
                    },
                ],
            });
        });
        let design = design.finish().unwrap();
        let doc = assemble(&design, "en").unwrap().unwrap();

        let urls: Vec<_> = doc.servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8000",
                "grpc://localhost:8080",
                "https://calc.example.com"
            ]
        );
        assert_eq!(doc.servers[0].description.as_deref(), Some("Development"));
        assert_eq!(doc.servers[2].description, None);
    }

    #[test]
    fn design_without_routes_has_no_document() {
        let mut design = DesignBuilder::new("internal");
        design
            .service("jobs", |s| s.method("run", |_| Ok(())))
            .unwrap();
        let design = design.finish().unwrap();
        assert_eq!(assemble(&design, "en").unwrap(), None);

        let empty = DesignBuilder::new("empty").finish().unwrap();
        assert_eq!(assemble(&empty, "en").unwrap(), None);
    }

    #[test]
    fn same_path_different_verbs_merge() {
        let mut design = DesignBuilder::new("items");
        design
            .service("items", |s| {
                s.method("show", |m| m.get("/items/{id}"))?;
                s.method("remove", |m| m.delete("/items/{id}"))
            })
            .unwrap();
        let design = design.finish().unwrap();
        let doc = assemble(&design, "en").unwrap().unwrap();

        assert_eq!(doc.paths.len(), 1);
        let item = &doc.paths["/items/{id}"];
        assert_eq!(item.get.as_ref().unwrap().operation_id, "items#show");
        assert_eq!(item.delete.as_ref().unwrap().operation_id, "items#remove");
    }

    #[test]
    fn conflicting_routes_abort_assembly() {
        let mut design = DesignBuilder::new("api");
        design
            .service("a", |s| s.method("one", |m| m.get("/same")))
            .unwrap();
        design
            .service("b", |s| s.method("two", |m| m.get("/same")))
            .unwrap();
        let design = design.finish().unwrap();

        let err = assemble(&design, "en").unwrap_err();
        assert_eq!(
            err,
            CompileError::ConflictingRoute {
                path: "/same".into(),
                verb: "GET".into(),
                first: "a#one".into(),
                second: "b#two".into(),
            }
        );
    }

    #[test]
    fn only_referenced_schemes_become_components() {
        let mut design = calc();
        design.basic_auth_security("basic", |_| Ok(())).unwrap();
        design.jwt_security("jwt", |_| Ok(())).unwrap();
        design
            .security(Target::Service("calc"), &["jwt".into()], |_| Ok(()))
            .unwrap();
        let design = design.finish().unwrap();

        let doc = assemble(&design, "en").unwrap().unwrap();
        let names: Vec<_> = doc.components.security_schemes.keys().collect();
        assert_eq!(names, vec!["jwt"]);
        let op = doc.paths["/add/{x}"].get.as_ref().unwrap();
        assert_eq!(
            serde_json::to_value(&op.security).unwrap(),
            json!([{"jwt": []}])
        );
    }

    #[test]
    fn no_security_renders_empty_security() {
        let mut design = DesignBuilder::new("api");
        design
            .service("svc", |s| {
                s.method("secret", |m| m.get("/secret"))?;
                s.method("health", |m| m.get("/health"))
            })
            .unwrap();
        design.basic_auth_security("basic", |_| Ok(())).unwrap();
        design
            .security(Target::Api, &["basic".into()], |_| Ok(()))
            .unwrap();
        design
            .no_security(Target::Method {
                service: "svc",
                method: "health",
            })
            .unwrap();
        let design = design.finish().unwrap();

        let doc = assemble(&design, "en").unwrap().unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["paths"]["/health"]["get"]["security"], json!([]));
        assert_eq!(
            json["paths"]["/secret"]["get"]["security"],
            json!([{"basic": []}])
        );
        assert_eq!(
            json["components"]["securitySchemes"]["basic"],
            json!({"type": "http", "scheme": "basic"})
        );
    }

    /// `calc` with a basic scheme and an OAuth2 scheme defining `calc:read`.
    fn calc_with_schemes() -> DesignBuilder {
        let mut design = calc();
        design.basic_auth_security("basic", |_| Ok(())).unwrap();
        design
            .oauth2_security("oauth", |s| {
                s.client_credentials_flow("/token", "")?;
                s.scope("calc:read", &["Read"])
            })
            .unwrap();
        design
    }

    fn add_security(design: &Design) -> serde_json::Value {
        let doc = assemble(design, "en").unwrap().unwrap();
        serde_json::to_value(&doc).unwrap()["paths"]["/add/{x}"]["get"]["security"].clone()
    }

    #[test]
    fn security_declarations_are_alternatives() {
        let mut design = calc_with_schemes();
        design
            .security(Target::Service("calc"), &["basic".into()], |_| Ok(()))
            .unwrap();
        design
            .security(Target::Service("calc"), &["oauth".into()], |r| {
                r.scope("calc:read")
            })
            .unwrap();
        let design = design.finish().unwrap();

        assert_eq!(
            add_security(&design),
            json!([{"basic": []}, {"oauth": ["calc:read"]}])
        );
    }

    #[test]
    fn schemes_of_one_declaration_are_all_required() {
        let mut design = calc_with_schemes();
        design
            .security(
                Target::Service("calc"),
                &["basic".into(), "oauth".into()],
                |r| r.scope("calc:read"),
            )
            .unwrap();
        let design = design.finish().unwrap();

        // Scopes stay on the scheme that defines them
        assert_eq!(
            add_security(&design),
            json!([{"basic": [], "oauth": ["calc:read"]}])
        );
        let doc = assemble(&design, "en").unwrap().unwrap();
        let names: Vec<_> = doc.components.security_schemes.keys().collect();
        assert_eq!(names, vec!["basic", "oauth"]);
    }

    #[test]
    fn method_security_overrides_service_and_api() {
        let mut design = calc_with_schemes();
        design
            .service("admin", |s| s.method("reset", |m| m.post("/reset")))
            .unwrap();
        design
            .security(Target::Api, &["basic".into()], |_| Ok(()))
            .unwrap();
        design
            .security(Target::Service("calc"), &["basic".into()], |_| Ok(()))
            .unwrap();
        design
            .security(
                Target::Method {
                    service: "calc",
                    method: "add",
                },
                &["oauth".into()],
                |r| r.scope("calc:read"),
            )
            .unwrap();
        let design = design.finish().unwrap();

        assert_eq!(add_security(&design), json!([{"oauth": ["calc:read"]}]));

        let doc = serde_json::to_value(&assemble(&design, "en").unwrap().unwrap()).unwrap();
        assert_eq!(
            doc["paths"]["/reset"]["post"]["security"],
            json!([{"basic": []}])
        );
    }

    #[test]
    fn assembly_is_deterministic() {
        let mut design = calc();
        design
            .service("admin", |s| {
                s.method("reset", |m| m.post("/reset"))?;
                s.method("stats", |m| m.get("/stats"))
            })
            .unwrap();
        let design = design.finish().unwrap();

        let first = serde_json::to_string(&assemble(&design, "en").unwrap()).unwrap();
        let second = serde_json::to_string(&assemble(&design, "en").unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
