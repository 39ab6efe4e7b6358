use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Target replica count of the server service.
///
/// Only `0` (stopped) and `1` (running) are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DesiredCount(u8);

impl DesiredCount {
    pub const STOPPED: DesiredCount = DesiredCount(0);
    pub const RUNNING: DesiredCount = DesiredCount(1);

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_running(self) -> bool {
        self == Self::RUNNING
    }
}

impl TryFrom<i64> for DesiredCount {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::STOPPED),
            1 => Ok(Self::RUNNING),
            other => Err(ModelError::InvalidDesiredCount(other)),
        }
    }
}

impl From<DesiredCount> for i64 {
    fn from(count: DesiredCount) -> Self {
        count.0 as i64
    }
}

impl fmt::Display for DesiredCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_zero_and_one_are_accepted() {
        assert_eq!(DesiredCount::try_from(0).unwrap(), DesiredCount::STOPPED);
        assert_eq!(DesiredCount::try_from(1).unwrap(), DesiredCount::RUNNING);
        assert_eq!(
            DesiredCount::try_from(2),
            Err(ModelError::InvalidDesiredCount(2))
        );
        assert!(DesiredCount::try_from(-1).is_err());
    }

    #[test]
    fn serde_goes_through_validation() {
        assert_eq!(serde_json::to_string(&DesiredCount::RUNNING).unwrap(), "1");
        assert!(serde_json::from_str::<DesiredCount>("3").is_err());
    }
}
