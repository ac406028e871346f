use thiserror::Error;

/// Data-integrity failures raised while resolving class properties.
///
/// None of these are transient; the caller either aborts the conversion or
/// drops the offending entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("class `{name}` is not declared in the project")]
    UnknownClass { name: String },

    #[error("cyclic class hierarchy: {}", chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("property `{property}` refers to undeclared class `{class}`")]
    UnresolvedClassReference { property: String, class: String },

    #[error("property `{property}` expected a {expected} value, got {found}")]
    InvalidValue {
        property: String,
        expected: &'static str,
        found: String,
    },
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
