//! In-memory chain client for router tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use tap_server::client::{encode_click, ChainClient, LogQuery};
use tap_server::error::ChainError;
use tap_server::types::RawLog;

/// Fixed-state chain that records every call
#[derive(Default)]
pub struct FakeChain {
    pub head: u64,
    pub logs: Vec<RawLog>,
    pub unavailable: bool,
    /// Stall applied to every chain head read
    pub delay: Option<Duration>,
    pub send_error: Option<String>,
    pub sent: Mutex<Vec<(Address, Bytes)>>,
    pub calls: AtomicUsize,
}

impl FakeChain {
    /// Chain whose log window holds `clicks` in order
    pub fn with_clicks(head: u64, clicks: &[(Address, u64)]) -> Self {
        Self {
            head,
            logs: clicks
                .iter()
                .map(|(user, total)| encode_click(*user, U256::from(*total)))
                .collect(),
            ..Default::default()
        }
    }

    /// Chain that fails every read
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) -> Result<(), ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ChainError::Timeout { seconds: 10 });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.touch()?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.head)
    }

    async fn get_logs(&self, _query: &LogQuery) -> Result<Vec<RawLog>, ChainError> {
        self.touch()?;
        Ok(self.logs.clone())
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        self.touch()?;
        Ok(Bytes::from(U256::from(7u64).to_be_bytes::<32>().to_vec()))
    }

    async fn code_at(&self, _address: Address) -> Result<Bytes, ChainError> {
        self.touch()?;
        Ok(Bytes::from_static(&[0x60, 0x80]))
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<B256, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.send_error {
            return Err(ChainError::Submission(message.clone()));
        }
        self.sent.lock().unwrap().push((to, data));
        Ok(B256::repeat_byte(0xab))
    }
}
