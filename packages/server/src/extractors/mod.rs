pub mod admin;
pub mod origin;
