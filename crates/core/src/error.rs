use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk {index} has {actual} tasks, expected {expected}")]
    ChunkShape {
        index: usize,
        expected: usize,
        actual: usize,
    },
}
