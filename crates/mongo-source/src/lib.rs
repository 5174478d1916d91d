//! `mongo-source`: MongoDB as a [`sheetsync_core::Source`].
//!
//! Collections are listed with `listCollections`, read with an unfiltered
//! `find`, and watched with one change stream per collection. Documents are
//! flattened into [`sheetsync_core::Record`]s with their field order intact.

pub mod convert;
pub mod source;

pub use source::MongoSource;
