pub mod collection;
pub use collection::Collection;
pub mod store;
pub use store::{Document, DocumentStore, StoreError};
pub mod pg_store;
pub use pg_store::PgDocumentStore;
pub mod repository;
pub use repository::{Record, Repository};
