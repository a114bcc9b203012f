//! Library discovery, indexing and persistence.
//!
//! A library is a named root directory whose supported audio files are kept
//! in a [`LibraryIndex`] together with their play history. The
//! [`LibraryRegistry`] owns every library known to the configuration home.

mod display;
mod index;
mod metadata;
mod model;
mod registry;
mod scan;
mod store;

pub use display::{display_from_fields, format_duration};
pub use index::{LibraryIndex, RescanPlan, RescanReport};
pub use metadata::{LoftyExtractor, MetadataExtractor, TrackMetadata};
pub use model::Track;
pub use registry::{Library, LibraryRegistry, LibrarySummary};
pub use scan::Scanner;
pub use store::LibraryStore;

#[cfg(test)]
mod tests;
