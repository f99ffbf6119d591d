//! External service integrations
//!
//! Each service module keeps its wire types private to itself and exposes
//! a client speaking domain types. [`traits`] defines the seams the rest of
//! the crate depends on.

pub mod plex;
pub mod slskd;
pub mod spotify;
pub mod traits;
