// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    load_blacklist, load_edge_list, load_urls_from_file, load_urls_from_source, parse_edge_list,
    parse_url_line,
};
