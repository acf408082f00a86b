pub mod media;
pub mod poster;
