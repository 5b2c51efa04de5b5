pub mod analyzer;
pub mod handlers;
pub mod normalize;
pub mod prompts;
