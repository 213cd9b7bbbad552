pub mod launcher;
pub mod page;
pub mod session;
