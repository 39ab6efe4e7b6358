use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Sizing tier selected by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ServerSize {
    #[default]
    Small,
    Medium,
    Large,
}

/// CPU and memory reserved for the single server task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSizing {
    /// CPU units (1024 = one vCPU).
    pub cpu: u32,
    /// Task memory in MiB.
    pub memory_mib: u32,
    /// Human hint about the player count the tier is meant for.
    pub description: &'static str,
}

impl ServerSize {
    pub const ALL: [ServerSize; 3] = [ServerSize::Small, ServerSize::Medium, ServerSize::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerSize::Small => "small",
            ServerSize::Medium => "medium",
            ServerSize::Large => "large",
        }
    }

    pub fn sizing(&self) -> TaskSizing {
        match self {
            ServerSize::Small => TaskSizing {
                cpu: 2048,
                memory_mib: 4096,
                description: "1-5 players",
            },
            ServerSize::Medium => TaskSizing {
                cpu: 2048,
                memory_mib: 8192,
                description: "5-10 players",
            },
            ServerSize::Large => TaskSizing {
                cpu: 4096,
                memory_mib: 16384,
                description: "10-20 players",
            },
        }
    }
}

impl fmt::Display for ServerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerSize {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(ServerSize::Small),
            "medium" => Ok(ServerSize::Medium),
            "large" => Ok(ServerSize::Large),
            _ => Err(ModelError::UnknownServerSize(s.to_string())),
        }
    }
}

impl TryFrom<String> for ServerSize {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TaskSizing {
    /// Returns `true` when Fargate accepts this CPU/memory pair.
    pub fn is_valid(&self) -> bool {
        fargate_supports(self.cpu, self.memory_mib)
    }

    /// Heap handed to the server JVM: 80% of the task memory, e.g. `"3276M"`.
    pub fn jvm_heap(&self) -> String {
        format!("{}M", self.memory_mib as u64 * 8 / 10)
    }
}

/// Fargate CPU/memory combinations.
///
/// Each row is `(cpu, min_mib, max_mib, step_mib)`; the 256 row is irregular and handled separately.
const FARGATE_TABLE: &[(u32, u32, u32, u32)] = &[
    (512, 1024, 4096, 1024),
    (1024, 2048, 8192, 1024),
    (2048, 4096, 16384, 1024),
    (4096, 8192, 30720, 1024),
    (8192, 16384, 61440, 4096),
    (16384, 32768, 122880, 8192),
];

pub fn fargate_supports(cpu: u32, memory_mib: u32) -> bool {
    if cpu == 256 {
        return matches!(memory_mib, 512 | 1024 | 2048);
    }
    FARGATE_TABLE
        .iter()
        .find(|(c, ..)| *c == cpu)
        .is_some_and(|&(_, min, max, step)| {
            (min..=max).contains(&memory_mib) && (memory_mib - min) % step == 0
        })
}
