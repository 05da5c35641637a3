use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config Error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
}
