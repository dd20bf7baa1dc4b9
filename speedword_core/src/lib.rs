pub mod bag;
pub mod board;
pub mod error;
pub mod judge;
pub mod messages;
pub mod reporting;
pub mod rules;
pub mod scoring;
