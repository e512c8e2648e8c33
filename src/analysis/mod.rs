pub mod change_points;
pub mod clustering;
pub mod outliers;
pub mod relevance;
pub mod sequence_outliers;
pub mod tree;

pub use change_points::BinarySegmentation;
pub use clustering::{HierarchicalClustering, Linkage};
pub use outliers::get_anomalies_median;
pub use relevance::{mrmr_select, RelevanceMethod, RelevanceTable};
pub use sequence_outliers::{find_discords, get_sequence_anomalies};
pub use tree::DecisionTreeRegressor;
