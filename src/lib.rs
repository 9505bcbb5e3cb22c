pub mod config;
pub mod dates;
pub mod dispatch;
pub mod document;
pub mod fetch;
pub mod harness;
pub mod matches;
pub mod model;
pub mod odds;
pub mod pipeline;
pub mod store;
pub mod totals;
