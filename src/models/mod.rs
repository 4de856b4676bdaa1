pub mod meeting;
pub mod report;
pub mod statement;
pub mod stats;

pub use meeting::*;
pub use report::*;
pub use statement::*;
pub use stats::*;
