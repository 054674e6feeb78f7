//! Database models split into domain-specific modules.

pub mod booking;
pub mod common;
pub mod therapist;
pub mod user;

pub use booking::*;
pub use common::*;
pub use therapist::*;
pub use user::*;
