//! Band transformations, coordinate indexing and product construction

pub mod band;
pub mod batch;
pub mod composite;
pub mod crop;
pub mod filter;
pub mod mask;
pub mod pipeline;
pub mod product;
pub mod projection;
pub mod resolver;
pub mod rotation;
pub mod transformation;

// Re-export main types
pub use band::{Band, BandSet, Resampling};
pub use batch::{build_all, build_one};
pub use crop::PolygonCrop;
pub use mask::{BadWaterRegions, MaskComposer, ObstructionPoints};
pub use pipeline::TransformationPipeline;
pub use product::{Georeference, SatelliteImage};
pub use resolver::{AffineResolver, IndexResolver, NearestGridResolver};
pub use rotation::Rotation;
pub use transformation::Transformation;
