use serde::{Deserialize, Serialize};

use crate::{KeyValue, ServerConfig};

/// Variable through which the server image learns the backup bucket.
pub const S3_BUCKET_VAR: &str = "S3_BUCKET";

/// Names set by the stack itself; operator variables may not use them.
pub const RESERVED_VARIABLES: &[&str] = &[S3_BUCKET_VAR];

/// Environment of the server container.
///
/// Stored as an ordered list of key–value pairs; later entries override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerEnv(Vec<KeyValue>);

impl ContainerEnv {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Image defaults followed by the operator's `variables`.
    ///
    /// `S3_BUCKET` is not included; the stack appends it with a reference to the bucket.
    pub fn for_server(cfg: &ServerConfig) -> Self {
        let mut env = Self::new();
        env.push("EULA", "TRUE");
        env.push("VERSION", "LATEST");
        env.push("MEMORY", cfg.sizing().jvm_heap());
        for (k, v) in &cfg.variables {
            env.push(k.as_str(), v.as_str());
        }
        env
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Value for `key`, taking the last matching entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Effective environment: one entry per name, each at the position of its first occurrence.
    pub fn resolved(&self) -> Vec<KeyValue> {
        let mut out: Vec<KeyValue> = Vec::with_capacity(self.0.len());
        for kv in &self.0 {
            match out.iter_mut().find(|e| e.key() == kv.key()) {
                Some(existing) => *existing = kv.clone(),
                None => out.push(kv.clone()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerSize;

    #[test]
    fn defaults_come_first_and_variables_override() {
        let mut cfg = ServerConfig {
            server_size: ServerSize::Medium,
            ..Default::default()
        };
        cfg.variables.insert("VERSION".into(), "1.21.1".into());
        cfg.variables.insert("MOTD".into(), "welcome".into());

        let env = ContainerEnv::for_server(&cfg);
        assert_eq!(env.get("EULA"), Some("TRUE"));
        assert_eq!(env.get("MEMORY"), Some("6553M"));
        assert_eq!(env.get("VERSION"), Some("1.21.1"));
        assert_eq!(env.get("MOTD"), Some("welcome"));
        assert!(env.get(S3_BUCKET_VAR).is_none());

        let resolved = env.resolved();
        let names: Vec<&str> = resolved.iter().map(|kv| kv.key()).collect();
        assert_eq!(names, vec!["EULA", "VERSION", "MEMORY", "MOTD"]);
        assert_eq!(resolved[1].value(), "1.21.1");
    }

    #[test]
    fn serialises_as_ecs_environment_list() {
        let mut env = ContainerEnv::new();
        env.push("EULA", "TRUE");
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"[{"Name":"EULA","Value":"TRUE"}]"#);
    }
}
