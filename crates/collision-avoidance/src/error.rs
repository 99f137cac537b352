use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollisionError {
    #[error("Track has no measurements: {0}")]
    EmptyTrack(String),
}

pub type Result<T> = std::result::Result<T, CollisionError>;
