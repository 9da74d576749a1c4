// LLM abstraction layer

pub mod openai;
pub mod provider;

#[cfg(test)]
pub mod testing;

pub use provider::*;
