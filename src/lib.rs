pub mod config;
pub mod error;
pub mod filter;
pub mod kind;
pub mod model;
pub mod publish;
pub mod rate_limit;
pub mod report;
pub mod resolve;
pub mod shutdown;
pub mod source;
pub mod sync;
