pub mod filename;
pub mod media_url;
