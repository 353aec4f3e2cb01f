pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use repositories::{
    DocumentRepository, InMemoryDocumentRepository, RepositoryError, SqlDocumentRepository,
};
