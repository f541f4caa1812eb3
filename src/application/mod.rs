// Application layer - Orchestration, filtering and collaborator traits
pub mod filter_engine;
pub mod orchestrator;
pub mod preferences;
pub mod session;
pub mod transport;

#[cfg(test)]
pub mod test_support;
