pub mod memory;
pub mod port;
pub mod postgres;

pub use memory::InMemoryPersistence;
pub use port::{Page, Pagination, PersistencePort};
pub use postgres::SqlxPostgresPersistence;
