use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Schema source unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Duplicate catalog id: {0}")]
    DuplicateCatalogId(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
