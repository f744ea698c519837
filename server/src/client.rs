//! Chain client abstraction and the tap contract binding

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    providers::{Provider, ProviderBuilder},
    rpc::types::{Filter, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::Http,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ChainError, DecodeError};
use crate::types::{ClickEvent, RawLog};

sol! {
    /// Tap contract surface used by the service
    contract TapContract {
        event Clicked(address indexed user, uint256 total);

        function tapFor(address user) external;
        function getClicks(address user) external view returns (uint256);
    }
}

pub use TapContract::Clicked;

type HttpTransport = Http<reqwest::Client>;

/// Log filter over an inclusive block range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    pub to_block: u64,
}

/// JSON-RPC capabilities the service depends on
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain head
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Logs matching the query, in provider order
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, ChainError>;

    /// Read-only contract call
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Deployed bytecode at an address
    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Sign and submit a call, returning as soon as the node accepts it
    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<B256, ChainError>;
}

/// alloy-backed chain client
pub struct AlloyChainClient<P> {
    provider: P,
    timeout: Duration,
    /// Held across nonce fill + submission so one key never races itself
    submit_lock: Mutex<()>,
}

impl<P: Provider<HttpTransport> + Clone> AlloyChainClient<P> {
    /// Wrap a provider, bounding every call by `timeout`
    pub fn new(provider: P, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            submit_lock: Mutex::new(()),
        }
    }

    async fn bounded<T, E, F>(&self, fut: F) -> Result<T, ChainError>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| ChainError::Rpc(e.to_string())),
            Err(_) => Err(ChainError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl<P: Provider<HttpTransport> + Clone + 'static> ChainClient for AlloyChainClient<P> {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.bounded(self.provider.get_block_number()).await
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, ChainError> {
        let filter = Filter::new()
            .address(query.address)
            .event_signature(query.topic0)
            .from_block(query.from_block)
            .to_block(query.to_block);

        let logs = self.bounded(self.provider.get_logs(&filter)).await?;

        Ok(logs
            .into_iter()
            .map(|log| RawLog {
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
                block_number: log.block_number,
                log_index: log.log_index,
                removed: log.removed,
            })
            .collect())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.bounded(self.provider.call(&tx)).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.bounded(self.provider.get_code_at(address)).await
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<B256, ChainError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);

        let _guard = self.submit_lock.lock().await;
        let pending = match tokio::time::timeout(self.timeout, self.provider.send_transaction(tx)).await {
            Ok(Ok(pending)) => pending,
            Ok(Err(e)) => return Err(ChainError::Submission(e.to_string())),
            Err(_) => {
                return Err(ChainError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        Ok(*pending.tx_hash())
    }
}

/// Connect a read-only client
pub fn connect(rpc_url: &str, timeout: Duration) -> Result<Arc<dyn ChainClient>, ChainError> {
    let url = rpc_url
        .parse()
        .map_err(|_| ChainError::InvalidUrl(rpc_url.to_string()))?;
    let provider = ProviderBuilder::new().on_http(url);

    debug!(rpc = %rpc_url, "Read client connected");
    Ok(Arc::new(AlloyChainClient::new(provider, timeout)))
}

/// Connect a client that signs with `private_key`
pub fn connect_signing(
    rpc_url: &str,
    private_key: &str,
    timeout: Duration,
) -> Result<(Arc<dyn ChainClient>, Address), ChainError> {
    let signer: PrivateKeySigner = private_key
        .trim()
        .parse()
        .map_err(|_| ChainError::InvalidPrivateKey)?;
    let sponsor = signer.address();
    let wallet = EthereumWallet::from(signer);

    let url = rpc_url
        .parse()
        .map_err(|_| ChainError::InvalidUrl(rpc_url.to_string()))?;
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(url);

    info!(sponsor = %sponsor, "Signing client connected");
    Ok((Arc::new(AlloyChainClient::new(provider, timeout)), sponsor))
}

/// Tap contract bound to a chain client
#[derive(Clone)]
pub struct TapClient {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl TapClient {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Current chain head
    pub async fn head(&self) -> Result<u64, ChainError> {
        self.chain.block_number().await
    }

    /// Raw `Clicked` logs emitted in `[from_block, to_block]`
    pub async fn clicked_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, ChainError> {
        let query = LogQuery {
            address: self.address,
            topic0: Clicked::SIGNATURE_HASH,
            from_block,
            to_block,
        };
        self.chain.get_logs(&query).await
    }

    /// On-chain click count of `user`
    pub async fn clicks_of(&self, user: Address) -> Result<U256, ChainError> {
        let data = TapContract::getClicksCall { user }.abi_encode();
        let output = self.chain.call(self.address, data.into()).await?;

        let decoded = TapContract::getClicksCall::abi_decode_returns(&output, true)
            .map_err(|e| ChainError::Rpc(format!("malformed getClicks result: {e}")))?;
        Ok(decoded._0)
    }

    /// Whether the contract address holds code
    pub async fn is_deployed(&self) -> Result<bool, ChainError> {
        Ok(!self.chain.code_at(self.address).await?.is_empty())
    }

    /// Submit `tapFor(user)`, returning the transaction hash
    pub async fn tap_for(&self, user: Address) -> Result<B256, ChainError> {
        let data = TapContract::tapForCall { user }.abi_encode();
        self.chain.send_transaction(self.address, data.into()).await
    }
}

/// Decode a raw log into a click event
pub fn decode_click(log: &RawLog) -> Result<ClickEvent, DecodeError> {
    if log.removed {
        return Err(DecodeError::Removed);
    }
    if log.topics.is_empty() {
        return Err(DecodeError::MissingTopic);
    }

    let event = Clicked::decode_raw_log(log.topics.iter().copied(), &log.data, true)
        .map_err(|e| DecodeError::Abi(e.to_string()))?;
    Ok(ClickEvent {
        participant: event.user,
        cumulative_count: event.total,
        block_number: log.block_number,
        log_index: log.log_index,
    })
}

/// Encode a `Clicked` log the way the contract emits it
pub fn encode_click(user: Address, total: U256) -> RawLog {
    let data = Clicked { user, total }.encode_log_data();
    RawLog {
        topics: data.topics().to_vec(),
        data: data.data,
        block_number: None,
        log_index: None,
        removed: false,
    }
}
