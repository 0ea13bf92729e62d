//! Candidate loading pipeline.
//!
//! - **discovery**: Expand CLI inputs into an ordered candidate list
//! - **validate**: Size check before decode/upload
//! - **decode**: Decode images with limits and timeout
//! - **loader**: Chunk candidates and load each chunk, skipping failures

pub mod decode;
pub mod discovery;
pub mod loader;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::FileDiscovery;
pub use loader::BatchLoader;
pub use validate::Validator;
