//! Networks the swap contract is known on, and where it is deployed.

use std::fmt;
use std::str::FromStr;

use ethers_core::types::Address;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "UPPERCASE"))]
pub enum Network {
    Mainnet,
    Rinkeby,
    Ropsten,
    Goerli,
    Kovan,
    Immutable,
    Polygon,
    Xdai,
}

// Networks without a deployment are listed with `None`.
const DEPLOYMENTS: [(Network, Option<&str>); 8] = [
    (Network::Mainnet, None),
    (Network::Rinkeby, Some("0x95E07f6357EFCfcf1e9098208Af7183Ba9909AFa")),
    (Network::Ropsten, None),
    (Network::Goerli, None),
    (Network::Kovan, None),
    (Network::Immutable, None),
    (Network::Polygon, None),
    (Network::Xdai, None),
];

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "MAINNET",
            Self::Rinkeby => "RINKEBY",
            Self::Ropsten => "ROPSTEN",
            Self::Goerli => "GOERLI",
            Self::Kovan => "KOVAN",
            Self::Immutable => "IMMUTABLE",
            Self::Polygon => "POLYGON",
            Self::Xdai => "XDAI",
        }
    }

    /// Address of the swap contract on this network, if deployed.
    pub fn contract_address(&self) -> Option<Address> {
        DEPLOYMENTS
            .iter()
            .find(|(network, _)| network == self)
            .and_then(|(_, address)| *address)
            .and_then(|address| address.parse().ok())
    }

    /// Resolves a network name to its contract address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedNetwork`] if the name is unknown or
    /// the contract has no deployment there.
    pub fn resolve(name: &str) -> Result<(Self, Address), ConfigError> {
        let network = name.parse::<Self>()?;
        let address = network
            .contract_address()
            .ok_or_else(|| ConfigError::UnsupportedNetwork(name.to_string()))?;
        Ok((network, address))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DEPLOYMENTS
            .iter()
            .map(|(network, _)| *network)
            .find(|network| network.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnsupportedNetwork(s.to_string()))
    }
}
