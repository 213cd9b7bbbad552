pub mod auth;
pub mod browser;
pub mod cli;
pub mod crawler;
pub mod cycle;
pub mod error;
pub mod interact;
pub mod page;
pub mod report;
pub mod trace;
