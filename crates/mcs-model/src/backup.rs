//! Naming and operator instructions for world backups.
//!
//! Backups are taken by hand against the running container. Nothing here moves data:
//! it only decides where an archive should land and spells out the command that puts it there.

use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

use crate::{ModelError, TaskArn};

pub const BACKUP_PREFIX: &str = "backups/";

/// Object key for an archive taken at `at`, e.g. `backups/world-2025-01-02T03:04:05Z.tar.gz`.
pub fn object_key(at: OffsetDateTime) -> Result<String, ModelError> {
    let ts = at
        .to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| ModelError::Timestamp(e.to_string()))?
        .format(&Rfc3339)
        .map_err(|e| ModelError::Timestamp(e.to_string()))?;
    Ok(format!("{BACKUP_PREFIX}world-{ts}.tar.gz"))
}

/// What an operator runs to archive the world of `task` into `bucket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    pub bucket: String,
    pub key: String,
    pub command: String,
}

impl BackupPlan {
    pub fn new(
        cluster: &str,
        task: &TaskArn,
        container: &str,
        bucket: &str,
        at: OffsetDateTime,
    ) -> Result<Self, ModelError> {
        let key = object_key(at)?;
        let inner = format!(
            "rcon-cli save-all flush && tar czf /tmp/world.tar.gz -C /data world && aws s3 cp /tmp/world.tar.gz s3://{bucket}/{key}"
        );
        let command = format!(
            "aws ecs execute-command --cluster {cluster} --task {} --container {container} --interactive --command \"/bin/sh -c '{inner}'\"",
            task.short_id()
        );
        Ok(Self {
            bucket: bucket.to_string(),
            key,
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn key_is_utc_without_fraction() {
        let at = datetime!(2025-03-04 05:06:07.891 +02:00);
        assert_eq!(
            object_key(at).unwrap(),
            "backups/world-2025-03-04T03:06:07Z.tar.gz"
        );
    }

    #[test]
    fn plan_targets_task_and_bucket() {
        let task = TaskArn::from("arn:aws:ecs:us-east-1:1:task/mc/abc");
        let at = datetime!(2025-01-01 00:00:00 UTC);
        let plan = BackupPlan::new("mc", &task, "MinecraftContainer", "bkt", at).unwrap();
        assert_eq!(plan.key, "backups/world-2025-01-01T00:00:00Z.tar.gz");
        assert!(plan.command.contains("--task abc"));
        assert!(plan.command.contains("s3://bkt/backups/world-2025-01-01T00:00:00Z.tar.gz"));
        assert!(!plan.command.contains("save-off"));
    }
}
