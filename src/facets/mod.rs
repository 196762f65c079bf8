pub mod color;
pub mod filter;
pub mod store;

pub use color::{cluster, ColorGroup};
pub use filter::{compute_options, FacetDimension, FacetOptions};
pub use store::{run_effect, Effect, FacetSnapshot, LibraryStore, StoreEvent};
