pub mod collaborators;
pub mod orchestrator;
