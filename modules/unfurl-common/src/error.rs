use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnfurlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Progress log error: {0}")]
    Progress(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
