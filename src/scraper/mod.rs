pub mod crawler;
pub mod discovery;
pub mod extractor;
pub mod models;

pub use crawler::{CrawlContext, Crawler, Pacer};
