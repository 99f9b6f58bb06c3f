//! Routing module
//!
//! Provides prefix routing from request paths to registered rules:
//! - Longest-prefix matching on segment boundaries
//! - Duplicate prefix detection at registration

mod table;

pub use table::{Route, RouteTable};
