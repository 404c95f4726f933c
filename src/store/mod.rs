//! CSV persistence of the rate table

pub mod archive;

pub use archive::Archive;
