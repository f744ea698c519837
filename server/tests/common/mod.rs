//! Common test utilities for integration tests

pub mod fake_chain;
pub mod mock_rpc;

pub use fake_chain::FakeChain;
pub use mock_rpc::MockRpc;
