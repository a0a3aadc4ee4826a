pub type TokenmillResult<T> = Result<T, TokenmillError>;

#[derive(thiserror::Error, Debug)]
pub enum TokenmillError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("asset load error: {0}")]
    AssetLoad(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("state error: {0}")]
    State(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TokenmillError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}
