pub mod diversity;
pub mod dispatch;
pub mod llm;
pub mod parser;
pub mod prompt;
pub mod request;
pub mod similarity;
pub mod workflow;
