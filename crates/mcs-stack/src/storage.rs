use mcs_model::BackupConfig;
use serde_json::{Value, json};

use crate::{Resource, StackError, Template, ids, template::get_att};

/// Private, encrypted, unversioned bucket that outlives the stack.
pub(crate) fn add_backup_bucket(t: &mut Template, backup: &BackupConfig) -> Result<(), StackError> {
    t.add(
        ids::BUCKET,
        Resource::new(
            "AWS::S3::Bucket",
            json!({
                "BucketEncryption": {
                    "ServerSideEncryptionConfiguration": [{
                        "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                    }]
                },
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true
                },
                "LifecycleConfiguration": {
                    "Rules": [{
                        "Id": "ExpireOldBackups",
                        "Status": "Enabled",
                        "ExpirationInDays": backup.retention_days,
                        "NoncurrentVersionExpirationInDays": backup.noncurrent_retention_days
                    }]
                }
            }),
        )
        .retained(),
    )
}

/// Bucket ARN and object ARN pattern, for policies.
pub(crate) fn bucket_arns() -> Value {
    json!([
        get_att(ids::BUCKET, "Arn"),
        { "Fn::Join": ["", [get_att(ids::BUCKET, "Arn"), "/*"]] }
    ])
}
