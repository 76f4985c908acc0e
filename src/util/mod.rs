//! Identity and container utilities shared by the whole crate.

pub mod ident;
pub mod sorted_map;
pub mod type_token;
