//! Shared building blocks for the poster catalog service.

pub mod storage;
