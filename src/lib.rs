pub mod cli;
pub mod config;
pub mod grouper;
pub mod pipeline;
pub mod sender;
pub mod source;
