pub mod base;
pub mod moving_average;
pub mod naive;

pub use base::Model;
pub use moving_average::MovingAverageModel;
pub use naive::NaiveModel;
