//! Request handlers for the document API.

mod documents;

pub use documents::*;
