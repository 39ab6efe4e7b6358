use std::{fmt, net::Ipv4Addr, str::FromStr};

use crate::ModelError;

/// IPv4 network range in CIDR notation.
///
/// Host bits must be zero: `10.0.0.1/24` is rejected instead of being silently widened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix) == u32::from(self.network)
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix as u32)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ModelError::InvalidCidr {
            value: s.to_string(),
            reason,
        };

        let (addr, prefix) = s.trim().split_once('/').ok_or(invalid("missing '/prefix'"))?;
        let network: Ipv4Addr = addr.parse().map_err(|_| invalid("bad IPv4 address"))?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid("bad prefix length"))?;
        if prefix > 32 {
            return Err(invalid("prefix length exceeds 32"));
        }
        if u32::from(network) & !mask(prefix) != 0 {
            return Err(invalid("host bits set"));
        }
        Ok(Self { network, prefix })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_ranges() {
        let any: Ipv4Cidr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(any, Ipv4Cidr::ANY);

        let home: Ipv4Cidr = "203.0.113.7/32".parse().unwrap();
        assert_eq!(home.prefix(), 32);
        assert_eq!(home.to_string(), "203.0.113.7/32");
    }

    #[test]
    fn rejects_malformed_ranges() {
        for bad in ["10.0.0.0", "10.0.0/8", "10.0.0.0/33", "10.0.0.1/24", "::/0", "x/1"] {
            assert!(bad.parse::<Ipv4Cidr>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn contains_checks_network_bits() {
        let lan: Ipv4Cidr = "192.168.1.0/24".parse().unwrap();
        assert!(lan.contains("192.168.1.200".parse().unwrap()));
        assert!(!lan.contains("192.168.2.1".parse().unwrap()));
        assert!(Ipv4Cidr::ANY.contains("8.8.8.8".parse().unwrap()));
    }
}
