//! CloudFormation template for the on-demand server.
//!
//! [`synthesize`] turns a validated [`mcs_model::ServerConfig`] into a [`Template`]: network
//! boundary, compute, backup bucket, orchestration state machines, HTTP API and budget alarm.

mod error;
pub use error::StackError;

mod template;
pub use template::{Output, Resource, Template, ids};

mod budget;
mod compute;
mod gateway;
mod network;
mod orchestration;
mod storage;

mod synth;
pub use synth::synthesize;
