use thiserror::Error;

/// Errors raised while reading a scene description or applying an edit.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("<{0}> tag is missing")]
    MissingTag(&'static str),
    #[error("<{tag}> expects three numbers, got {value:?}")]
    InvalidVector { tag: &'static str, value: String },
    #[error("<{tag}> is not a number: {value:?}")]
    InvalidNumber { tag: &'static str, value: String },
    #[error("<{tag}> is not a boolean: {value:?}")]
    InvalidBool { tag: &'static str, value: String },
    #[error("invalid colour {0:?}; expected #RRGGBB")]
    InvalidColor(String),
    #[error("unknown shape type {0:?}")]
    UnknownShapeKind(String),
    #[error("unknown axis {0:?}")]
    UnknownAxis(String),
    #[error("{name} is not a valid duration: {value}")]
    InvalidDuration { name: &'static str, value: f64 },
    #[error("no shape at index {0}")]
    NoSuchShape(usize),
}
