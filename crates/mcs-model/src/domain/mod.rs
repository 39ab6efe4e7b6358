mod kv;
pub use kv::KeyValue;

mod container_env;
pub use container_env::{ContainerEnv, RESERVED_VARIABLES, S3_BUCKET_VAR};

mod desired_count;
pub use desired_count::DesiredCount;

mod address;
pub use address::{AddressLookup, TaskAddress, TaskArn};

mod server_status;
pub use server_status::ServerStatus;

mod dns;
pub use dns::{DnsChange, DnsOutcome};

mod execution_id;
pub use execution_id::ExecutionId;

mod execution_kind;
pub use execution_kind::ExecutionKind;

mod execution_status;
pub use execution_status::ExecutionStatus;

mod execution_info;
pub use execution_info::ExecutionInfo;

mod execution_query;
pub use execution_query::{ExecutionPage, ExecutionQuery};
