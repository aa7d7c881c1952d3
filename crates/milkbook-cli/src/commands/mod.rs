pub mod add;
pub mod batches;
pub mod common;
pub mod completions;
pub mod config;
pub mod deduct;
pub mod dispatch;
pub mod edit;
pub mod list;
pub mod pending;
pub mod refresh;
pub mod status;
pub mod sync;
pub mod watch;
