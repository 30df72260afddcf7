//! Network address helpers.
//!
//! # Data Flow
//! ```text
//! "10.0.0.5/24"
//!     → cidr.rs (split, parse address and prefix)
//!     → CidrInfo { address, mask, prefix, network }
//! ```

pub mod cidr;

pub use cidr::{parse_cidr, CidrError, CidrInfo};
