//! Client for a chunked distributed file store.
//!
//! Files are split into fixed-size chunks. Each chunk is replicated onto
//! several chunkservers picked by the [`placement`] planner, and the master
//! records where every replica lives. Reads pull each chunk from the first
//! replica that answers and stitch the chunks back together in order.
//!
//! Write flow:
//! - client splits the file into chunks
//! - client asks the master for the chunkservers and registers the file
//! - for every replication round, client registers a replica with the master
//!   and pushes the chunk bytes to the chosen chunkserver
//! - the write succeeds once every chunk has at least one stored replica
//!
//! The master and the chunkservers sit behind the [`master::MasterService`]
//! and [`chunkserver::ChunkserverService`] traits; HTTP and in-memory
//! implementations of both are provided.

pub mod chunk;
pub mod chunkserver;
pub mod client;
pub mod common;
pub mod config;
pub mod error;
pub mod logging;
pub mod master;
pub mod placement;

mod transport;

pub use client::{Client, DeleteReport, WriteReport};
pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind, RemoteError, Result};
