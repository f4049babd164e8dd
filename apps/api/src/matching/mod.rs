pub mod balancer;
pub mod budget;
pub mod error;
pub mod expander;
pub mod hard_gate;
pub mod handlers;
pub mod pipeline;
pub mod policy;
pub mod prompts;
pub mod ranker;
pub mod semantic;
pub mod skills;

#[cfg(test)]
pub mod fakes;
