//! Handle Service SDK - Rust Client Library
//!
//! Typed client for the `AbstractHandle` service: persist file handles, look
//! them up, manage read ACLs on the underlying store and delete them.
//!
//! # Example
//!
//! ```no_run
//! use handle_service_sdk::{FetchHandlesParams, Handle, HandleServiceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HandleServiceClient::with_token(
//!         "https://kbase.us/services/handle_service",
//!         std::env::var("KB_AUTH_TOKEN")?,
//!     )
//!     .await?;
//!
//!     let handle = Handle::new()
//!         .with_id("a1b2c3-shock-node")
//!         .with_file_name("reads.fastq")
//!         .with_store_type("shock")
//!         .with_url("https://kbase.us/services/shock-api");
//!     let hid = client.persist_handle(&handle, None).await?;
//!
//!     let found = client
//!         .fetch_handles_by(&FetchHandlesParams::new("hid", [hid.as_str()]), None)
//!         .await?;
//!     println!("Persisted {} -> {:?}", hid, found);
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::{Credentials, HandleServiceClient};
pub use handle_service_core::domain::{FetchHandlesParams, Handle, HandleId, NodeId, RpcContext};
pub use handle_service_core::error::{ClientError, Result};
pub use handle_service_core::port::{JsonRpcCaller, RpcCall};
pub use handle_service_infra_http::{AuthToken, CallerConfig, HttpJsonRpcCaller, DEFAULT_AUTH_URL};
