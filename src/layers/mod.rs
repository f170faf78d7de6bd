pub mod traits;
pub mod initialization;
pub mod rescale;
pub mod conv;
pub mod flatten;
pub mod dense;
pub mod dueling;

pub use traits::Layer;
pub use rescale::RescaleLayer;
pub use conv::Conv2DLayer;
pub use flatten::FlattenLayer;
pub use dense::DenseLayer;
pub use dueling::{AdvantagePolicy, DuelingHead};
