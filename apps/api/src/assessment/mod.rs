pub mod catalog;
pub mod eligibility;
pub mod fallback;
pub mod gaps;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod prompts;

#[cfg(test)]
pub mod test_support;
