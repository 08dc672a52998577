pub mod migrate;
pub mod review;
pub mod token;
pub mod usage;
