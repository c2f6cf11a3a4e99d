pub mod accumulator;
pub mod scheduler;
