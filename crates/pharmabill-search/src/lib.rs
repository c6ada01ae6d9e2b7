//! Type-ahead search for customers and products.
//!
//! Keystrokes are debounced and every submission is numbered; a response is
//! applied only if no newer query was submitted while it was in flight.

pub mod session;
pub mod source;

pub use session::{SearchOutcome, SearchSession, SearchSettings, SearchSnapshot};
pub use source::{CatalogSource, CustomerLookup, Lookup, ProductLookup};
