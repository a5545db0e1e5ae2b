use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use byte_unit::Byte;
use dfs::chunkserver::{MemoryChunkserver, NetworkShim};
use dfs::logging::init_logging;
use dfs::master::MemoryMaster;
use dfs::{Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info");

    let network = Arc::new(NetworkShim::new());

    // Setup master.
    println!("Creating master.\n");
    let master = Arc::new(MemoryMaster::new());

    // Setup chunkserver 1-N.
    let n_chunkservers = 3;
    for i in 0..n_chunkservers {
        println!("Creating chunkserver {}.\n", i);
        let host = format!("http://chunkserver-{i}");
        network.add_node(Arc::new(MemoryChunkserver::new(host.clone())));

        // Register the chunkserver with the master.
        master.register_chunkserver(host);
    }

    // Setup client.
    println!("Creating client.\n");
    let config = ClientConfig::new("http://master")
        .with_replication_level(NonZeroUsize::new(2).ok_or("replication level")?);
    let client = Client::new(config, master.clone(), network.clone())?;

    // Not valid UTF-8, and spans a few chunks.
    let data: Bytes = (0..4000u32).map(|i| (i % 256) as u8).rev().collect::<Vec<_>>().into();
    let report = client.create_file("/test", data.clone()).await?;
    println!("wrote {} chunks, {} replicas", report.chunks, report.replicas_stored);

    // Lose a node. Every chunk still has a replica elsewhere.
    if let Some(node) = network.get_node("http://chunkserver-0") {
        node.set_down(true);
    }
    let read = client.read_file("/test").await?;
    println!("read back {} bytes, identical: {}", read.len(), read == data);

    let size = client.get_size("/test").await?;
    println!("size: {:#}", Byte::from_u64(size));

    // The down node cannot drop its replicas, so this reports a partial delete.
    match client.delete_file("/test").await {
        Ok(report) => println!("deleted {} replicas", report.replicas_deleted),
        Err(e) => println!("delete: {e}"),
    }

    Ok(())
}
