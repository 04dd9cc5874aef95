mod utils;
pub mod wolff;

pub use wolff::{wolff_update, Cluster};
