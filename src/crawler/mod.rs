pub mod cancel;
pub mod crawler;
pub mod url_utils;
