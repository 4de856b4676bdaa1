pub mod stage0_parse;
pub mod stage1_normalize;
pub mod stage2_aggregate;
pub mod stage3_assemble;

pub use stage0_parse::*;
pub use stage1_normalize::*;
pub use stage2_aggregate::*;
pub use stage3_assemble::*;
