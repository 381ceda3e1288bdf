mod types;
pub use types::Instruction;

mod bucket;
pub use bucket::Bucket;

mod runner;
pub use runner::Runner;

mod builder;
pub use builder::Builder;
