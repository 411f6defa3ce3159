pub mod adaptive;
pub mod cache;
pub mod downgrade;
pub mod recommendation;
pub mod scoring;
pub mod similarity;
