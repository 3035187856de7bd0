//! SDK configuration: JSON loading, validation and connection.

use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use ethers::providers::{Http, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use swapkit_core::{ConfigError, GasOverrides, Network, DEFAULT_GAS_LIMIT};
use tracing::debug;
use url::Url;

use crate::contract::ethereum::EthereumSwapContract;
use crate::sdk::{SwapClient, DEFAULT_CONFIRMATIONS};
use crate::Result;

/// JSON-serializable SDK settings.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkConfig {
    /// Network name from the deployment table, e.g. `RINKEBY`.
    pub network: String,
    /// JSON-RPC endpoint URL
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Hex-encoded private key of the signer
    #[serde(default)]
    pub private_key: Option<String>,
    /// Withhold the signer; only reads are allowed
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub confirmations: Option<usize>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<U256>,
}

impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &redacted(&self.private_key))
            .field("read_only", &self.read_only)
            .field("confirmations", &self.confirmations)
            .field("gas_limit", &self.gas_limit)
            .field("gas_price", &self.gas_price)
            .finish()
    }
}

fn redacted(key: &Option<String>) -> Option<&'static str> {
    key.as_ref().map(|_| "<redacted>")
}

/// Reads a JSON-encoded [`SdkConfig`] from `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<SdkConfig> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            anyhow::bail!("SDK config file {:?} not found", path);
        }
        Err(e) => return Err(e).context(format!("opening file {:?}", path)),
    };
    serde_json::from_reader(file).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Where the SDK reaches the chain.
#[derive(Debug, Clone)]
pub(crate) enum ProviderSource {
    /// Caller-supplied provider; its account list supplies the sender.
    Direct(Provider<Http>),
    JsonRpc(Url),
}

/// Validated construction arguments.
#[derive(Debug)]
pub(crate) struct Settings {
    pub network: Network,
    pub contract: Address,
    pub source: ProviderSource,
    pub wallet: Option<LocalWallet>,
    pub read_only: bool,
    pub confirmations: usize,
    pub gas: GasOverrides,
}

/// Builds a connected [`SwapClient`].
///
/// Exactly one of [`SdkBuilder::provider`] and [`SdkBuilder::rpc_url`]
/// must be given. All arguments are checked before anything connects.
#[derive(Default)]
pub struct SdkBuilder {
    network: String,
    provider: Option<Provider<Http>>,
    rpc_url: Option<String>,
    private_key: Option<String>,
    read_only: bool,
    confirmations: Option<usize>,
    gas: Option<GasOverrides>,
}

impl fmt::Debug for SdkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkBuilder")
            .field("network", &self.network)
            .field("provider", &self.provider.as_ref().map(|p| p.url().to_string()))
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &redacted(&self.private_key))
            .field("read_only", &self.read_only)
            .field("confirmations", &self.confirmations)
            .field("gas", &self.gas)
            .finish()
    }
}

impl SdkBuilder {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Default::default()
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        let gas = (config.gas_limit.is_some() || config.gas_price.is_some()).then(|| GasOverrides {
            gas_limit: Some(config.gas_limit.unwrap_or(DEFAULT_GAS_LIMIT)),
            gas_price: config.gas_price,
        });
        Self {
            network: config.network.clone(),
            provider: None,
            rpc_url: config.rpc_url.clone(),
            private_key: config.private_key.clone(),
            read_only: config.read_only,
            confirmations: config.confirmations,
            gas,
        }
    }

    /// Use an already-constructed provider.
    pub fn provider(mut self, provider: Provider<Http>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = Some(confirmations);
        self
    }

    pub fn gas(mut self, gas: GasOverrides) -> Self {
        self.gas = Some(gas);
        self
    }

    pub(crate) fn validate(self) -> std::result::Result<Settings, ConfigError> {
        let source = match (self.provider, self.rpc_url) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingProviders),
            (None, None) => return Err(ConfigError::MissingProvider),
            (Some(provider), None) => ProviderSource::Direct(provider),
            (None, Some(url)) => {
                let parsed = Url::parse(&url).map_err(|_| ConfigError::InvalidRpcUrl(url.clone()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidRpcUrl(url));
                }
                ProviderSource::JsonRpc(parsed)
            }
        };

        let (network, contract) = Network::resolve(&self.network)?;

        let wallet = match (self.read_only, self.private_key) {
            (true, _) => None,
            (false, Some(key)) => Some(parse_wallet(&key)?),
            (false, None) if matches!(source, ProviderSource::JsonRpc(_)) => {
                return Err(ConfigError::MissingSigner);
            }
            (false, None) => None,
        };

        let confirmations = self.confirmations.unwrap_or(DEFAULT_CONFIRMATIONS);
        if confirmations < 1 {
            return Err(ConfigError::InvalidConfirmationDepth(confirmations));
        }

        Ok(Settings {
            network,
            contract,
            source,
            wallet,
            read_only: self.read_only,
            confirmations,
            gas: self.gas.unwrap_or_default(),
        })
    }

    /// Validates the arguments, then connects to the swap contract.
    pub async fn connect(self) -> Result<SwapClient<EthereumSwapContract>> {
        let settings = self.validate()?;
        debug!(network = %settings.network, read_only = settings.read_only, "Connecting SDK");

        let provider = match settings.source {
            ProviderSource::Direct(provider) => provider,
            ProviderSource::JsonRpc(url) => Provider::new(Http::new(url)),
        };
        let contract =
            EthereumSwapContract::connect(provider, settings.contract, settings.wallet).await?;

        let mut client = SwapClient::new(contract)
            .with_read_only(settings.read_only)
            .with_gas(settings.gas);
        client.set_confirmations(settings.confirmations)?;
        Ok(client)
    }
}

fn parse_wallet(key: &str) -> std::result::Result<LocalWallet, ConfigError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<LocalWallet>()
        .map_err(|_| ConfigError::InvalidPrivateKey)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const RPC: &str = "http://localhost:8545";

    fn direct() -> Provider<Http> {
        Provider::<Http>::try_from(RPC).unwrap()
    }

    #[test]
    fn both_providers_conflict() {
        let err = SdkBuilder::new("RINKEBY")
            .provider(direct())
            .rpc_url(RPC)
            .private_key(KEY)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::ConflictingProviders);
    }

    #[test]
    fn a_provider_is_required() {
        let err = SdkBuilder::new("RINKEBY").validate().unwrap_err();
        assert_eq!(err, ConfigError::MissingProvider);
    }

    #[test]
    fn rpc_url_must_be_http() {
        for url in ["not a url", "wss://example.org"] {
            let err = SdkBuilder::new("RINKEBY")
                .rpc_url(url)
                .private_key(KEY)
                .validate()
                .unwrap_err();
            assert_eq!(err, ConfigError::InvalidRpcUrl(url.into()));
        }
    }

    #[test]
    fn unknown_network_is_unsupported() {
        let err = SdkBuilder::new("ATLANTIS")
            .rpc_url(RPC)
            .private_key(KEY)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedNetwork("ATLANTIS".into()));
    }

    #[test]
    fn json_rpc_needs_signer_unless_read_only() {
        let err = SdkBuilder::new("RINKEBY").rpc_url(RPC).validate().unwrap_err();
        assert_eq!(err, ConfigError::MissingSigner);

        let settings = SdkBuilder::new("RINKEBY")
            .rpc_url(RPC)
            .read_only(true)
            .validate()
            .unwrap();
        assert!(settings.read_only);
        assert!(settings.wallet.is_none());
    }

    #[test]
    fn direct_provider_signs_through_node() {
        let settings = SdkBuilder::new("rinkeby").provider(direct()).validate().unwrap();
        assert!(settings.wallet.is_none());
        assert!(!settings.read_only);
        assert!(matches!(settings.source, ProviderSource::Direct(_)));
    }

    #[test]
    fn bad_private_key_is_rejected() {
        let err = SdkBuilder::new("RINKEBY")
            .rpc_url(RPC)
            .private_key("0xdeadbeef")
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPrivateKey);
    }

    #[test]
    fn confirmation_depth_must_be_positive() {
        let err = SdkBuilder::new("RINKEBY")
            .rpc_url(RPC)
            .private_key(KEY)
            .confirmations(0)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidConfirmationDepth(0));

        let settings = SdkBuilder::new("RINKEBY")
            .rpc_url(RPC)
            .private_key(KEY)
            .validate()
            .unwrap();
        assert_eq!(settings.confirmations, DEFAULT_CONFIRMATIONS);
        assert_eq!(settings.gas, GasOverrides::default());
        assert_eq!(settings.network, Network::Rinkeby);
    }

    #[test]
    fn loads_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"network": "RINKEBY", "rpc_url": "{RPC}", "read_only": true, "gas_limit": 500000}}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.network, "RINKEBY");
        assert!(config.read_only);
        assert!(config.private_key.is_none());

        let settings = SdkBuilder::from_config(&config).validate().unwrap();
        assert_eq!(settings.gas.gas_limit, Some(500_000));
    }

    #[test]
    fn debug_output_hides_private_key() {
        let bare = KEY.trim_start_matches("0x");
        let config = SdkConfig {
            network: "RINKEBY".into(),
            private_key: Some(KEY.into()),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(bare));
        assert!(rendered.contains("<redacted>"));

        let builder = SdkBuilder::from_config(&config).provider(direct());
        let rendered = format!("{builder:?}");
        assert!(!rendered.contains(bare));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("localhost:8545"));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config("/nonexistent/swapkit.json").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
