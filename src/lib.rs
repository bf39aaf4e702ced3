pub mod changelog;
pub mod cli;
pub mod delta;
pub mod error;
pub mod model;
pub mod parsers;
pub mod session;
pub mod source;
pub mod watch;
