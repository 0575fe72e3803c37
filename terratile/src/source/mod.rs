//! Raster source abstraction
//!
//! Defines the per-category fetch traits the composition engine
//! consumes ([`CoverageSource`], [`ColorSource`], [`ElevationSource`])
//! and the [`sample_ancestors`] walk that guarantees best-available
//! data at any tile address.
//!
//! Sources are external collaborators: disk readers, network clients,
//! or in-memory fixtures. The engine only borrows read access per
//! request; absent data is `Ok(None)`, never an error.

mod ancestor;
mod types;

pub use ancestor::{sample_ancestors, AncestorSample};
pub use types::{ColorSource, CoverageSource, ElevationSource, SourceError};
