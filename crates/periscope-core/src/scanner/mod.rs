mod walk;

pub use walk::{find_files_by_size, SearchResult};
