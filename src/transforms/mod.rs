pub mod add_constant;
pub mod base;
pub mod feature_selection;
pub mod scaler;
pub mod trend;

pub use add_constant::AddConstTransform;
pub use base::Transform;
pub use feature_selection::{MRMRFeatureSelectionTransform, TreeFeatureSelectionTransform};
pub use scaler::StandardScalerTransform;
pub use trend::TrendTransform;
