pub mod analysis;
pub mod report;

pub use analysis::*;
pub use report::*;
