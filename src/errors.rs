use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON decode: {0}")]
    BsonDe(#[from] bson::de::Error),

    #[error("BSON encode: {0}")]
    BsonSer(#[from] bson::ser::Error),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("Document not found: {0}")]
    NoSuchDocument(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Aggregation error: {0}")]
    AggregateError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("WAL error: {0}")]
    WalError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Logger error: {0}")]
    LoggerError(String),
}
