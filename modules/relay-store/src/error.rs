use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cascade limit reached: more than {limit} actions in a single dispatch")]
    CascadeLimit { limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
