pub mod extract;
pub(crate) mod health;

pub use extract::{extract_from_url, extract_text};
pub use health::health_check;
