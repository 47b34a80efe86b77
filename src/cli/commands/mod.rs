mod config;
mod delete;
mod find_text;
mod ingest;
mod search;
mod serve;
mod status;
mod threads;

pub use config::ConfigCommand;
pub use delete::DeleteArgs;
pub use find_text::FindTextArgs;
pub use ingest::IngestArgs;
pub use search::SearchArgs;
pub use serve::ServeArgs;
pub use threads::ThreadsArgs;

pub use config::handle_config;
pub use delete::handle_delete;
pub use find_text::handle_find_text;
pub use ingest::handle_ingest;
pub use search::handle_search;
pub use serve::handle_serve;
pub use status::handle_status;
pub use threads::handle_threads;
