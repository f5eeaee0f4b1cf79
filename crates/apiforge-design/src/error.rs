use thiserror::Error;

/// Usage errors reported while building a design (E2001–E2015).
///
/// A usage error aborts the declaration that produced it; the builder keeps
/// going so that every problem in a design is reported in one batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DesignError {
    /// E2001: Declaration used outside the context it belongs to.
    #[error("E2001: {dsl} cannot be used at {context}")]
    IncompatibleContext { dsl: &'static str, context: String },

    /// E2002: Security scheme name already registered.
    #[error("E2002: cannot redefine security scheme with name \"{0}\"")]
    DuplicateScheme(String),

    /// E2003: OAuth2 flow declared on a scheme of another kind.
    #[error("E2003: cannot specify flow for non-oauth2 security scheme \"{0}\"")]
    InvalidSchemeKind(String),

    /// E2004: Too many arguments to a declaration.
    #[error("E2004: too many arguments to {0}")]
    TooManyArguments(String),

    /// E2005: Security requirement references an unregistered scheme.
    #[error("E2005: security scheme \"{0}\" not found")]
    UnknownScheme(String),

    /// E2006: Required scope not defined by any scheme of the requirement.
    #[error("E2006: scope \"{scope}\" is not defined by security scheme(s) {schemes}")]
    UnknownScope { scope: String, schemes: String },

    /// E2007: Service name already used.
    #[error("E2007: cannot redefine service \"{0}\"")]
    DuplicateService(String),

    /// E2008: Method name already used in its service.
    #[error("E2008: cannot redefine method \"{method}\" in service \"{service}\"")]
    DuplicateMethod { service: String, method: String },

    /// E2009: Type name already used.
    #[error("E2009: cannot redefine type \"{0}\"")]
    DuplicateType(String),

    /// E2010: Payload or result references an undeclared type.
    #[error("E2010: type \"{0}\" not found")]
    UnknownType(String),

    /// E2011: Malformed route path template.
    #[error("E2011: invalid path template: {0}")]
    InvalidPathTemplate(String),

    /// E2012: Security declaration with no scheme.
    #[error("E2012: security requirement must reference at least one scheme")]
    EmptyRequirement,

    /// E2013: Declaration targets a service or method that does not exist.
    #[error("E2013: {0} not found")]
    UnknownTarget(String),

    /// E2014: Design file cannot be read or decoded.
    #[error("E2014: invalid design file: {0}")]
    InvalidDesignFile(String),

    /// E2015: OAuth2 scheme without any flow.
    #[error("E2015: oauth2 security scheme \"{0}\" must declare at least one flow")]
    MissingFlows(String),
}

impl DesignError {
    /// Stable error code, e.g. `"E2002"`.
    pub fn code(&self) -> &'static str {
        match self {
            DesignError::IncompatibleContext { .. } => "E2001",
            DesignError::DuplicateScheme(_) => "E2002",
            DesignError::InvalidSchemeKind(_) => "E2003",
            DesignError::TooManyArguments(_) => "E2004",
            DesignError::UnknownScheme(_) => "E2005",
            DesignError::UnknownScope { .. } => "E2006",
            DesignError::DuplicateService(_) => "E2007",
            DesignError::DuplicateMethod { .. } => "E2008",
            DesignError::DuplicateType(_) => "E2009",
            DesignError::UnknownType(_) => "E2010",
            DesignError::InvalidPathTemplate(_) => "E2011",
            DesignError::EmptyRequirement => "E2012",
            DesignError::UnknownTarget(_) => "E2013",
            DesignError::InvalidDesignFile(_) => "E2014",
            DesignError::MissingFlows(_) => "E2015",
        }
    }
}

/// Every usage error collected while building a design, in report order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("design has {} error(s)", .0.len())]
pub struct DesignErrors(pub Vec<DesignError>);

impl DesignErrors {
    pub fn iter(&self) -> impl Iterator<Item = &DesignError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<DesignError> for DesignErrors {
    fn from(err: DesignError) -> Self {
        Self(vec![err])
    }
}
