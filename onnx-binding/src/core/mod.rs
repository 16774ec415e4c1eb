//! Core types shared across the library

pub mod unified_error;
