use thiserror::Error;

/// Errors raised while compiling a filter specification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterSpecError {
    #[error("Invalid filter element '{element}': '{character}' is reserved")]
    ReservedCharacter { element: String, character: char },

    #[error("Invalid filter element '!': a reject marker needs a class name")]
    EmptyRejectElement,

    #[error(
        "Invalid filter element '{element}': '*' is only allowed as the final character, as in 'pkg.*', 'pkg.**' or 'prefix*'"
    )]
    MisplacedWildcard { element: String },

    #[error("Invalid filter element '{element}': '.**' needs a package name")]
    EmptyHierarchy { element: String },
}

/// Errors raised while classifying a class name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Class name must not be empty")]
    InvalidArgument,

    #[error(transparent)]
    Spec(#[from] FilterSpecError),
}
