//! AWS backend for the control plane seams.
//!
//! Every call shells out to the `aws` CLI with `--output json`, so credentials, profiles and
//! regions resolve exactly as they do for an operator at a terminal.

mod error;
pub use error::AwsError;

mod cli;
pub use cli::{AwsCall, AwsCli};

mod ecs;
pub use ecs::EcsService;

mod route53;
pub use route53::Route53Zone;
