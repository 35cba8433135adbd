//! Game implementations.

pub mod cathedral;
