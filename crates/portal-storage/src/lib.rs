pub mod error;
pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use portal_core::repository::{ClickRepository, LinkRepository, Result};
pub use portal_core::StorageError;
