pub mod poster;
pub mod shared;
