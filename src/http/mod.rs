//! HTTP protocol layer module
//!
//! Content-type lookup and response building, decoupled from rule dispatch.

pub mod mime;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_400_response, build_404_response, build_413_response, build_500_response, build_from_parts,
};
