pub mod directory;
pub mod rpc_chain_client;

pub use directory::StaticDirectory;
pub use rpc_chain_client::RpcChainClient;
