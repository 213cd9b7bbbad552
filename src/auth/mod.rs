pub mod credential;
pub mod rules;
pub mod strategy;
