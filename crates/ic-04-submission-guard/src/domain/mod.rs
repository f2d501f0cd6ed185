//! # Domain Layer - Submission Guard

pub mod notice;

pub use notice::*;
