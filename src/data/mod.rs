pub mod dataset;
pub mod generators;
pub mod validator;

pub use dataset::TSDataset;
pub use generators::{generate_ar_df, generate_const_df, generate_periodic_df};
pub use validator::DataValidator;
