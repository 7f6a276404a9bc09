use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No relative path, alias or workspace package claimed the request.
    #[error("request did not match any alias or workspace package")]
    AliasNotResolved,
    /// A path was computed but no indexed file exists for it. Carries the attempted path.
    #[error("no file found for module path '{0}'")]
    FileNotFound(String),
}
