pub mod text;

pub use text::{search_terms, truncate_with_ellipsis};
