pub mod engine;
pub mod ladder;
