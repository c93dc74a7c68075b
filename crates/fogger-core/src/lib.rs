//! Core pixel buffer types for fogger image blurring.
//!
//! Provides [`Image`], an owned RGBA8 pixel buffer, and the error type
//! shared by its constructors. Compute backends and the blur executor
//! live in `fogger-blur`; this crate carries no compute dependencies.

mod error;
mod image;

pub use error::{Error, Result};
pub use image::{CHANNELS, Image};
