pub mod handlers;
pub mod manager;
pub mod schema;
pub mod store;

pub use handlers::{run_database_handler, serve_tasks};
pub use manager::DatabaseManager;
pub use store::{DuckDbStore, MemoryStore, StepStore, StoreError};
