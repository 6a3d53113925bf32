//! Concrete patch recipes for the CareerOS tree, built on [`crate::mutate`].

pub mod ci;
pub mod summary;
pub mod wire_tracker;
