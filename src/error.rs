#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid markup: {0}")]
    Parse(String),
    #[error("unexpected form structure: {0}")]
    Structure(String),
    #[error("failed to compile decoration pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no field named {0} in the loaded form")]
    UnknownField(String),
    #[error("no form is loaded")]
    NotReady,
}
