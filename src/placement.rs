//! Replica placement.
//!
//! Every replication round shuffles the chunkserver list and hands chunk
//! numbers out round-robin. A chunk never gets a node it already holds a
//! replica on while an unused node remains.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::common::{ChunkNumber, ChunkserverInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub chunk_number: ChunkNumber,
    pub host: String,
}

/// Placements of one replication round, one per chunk number, ascending.
pub type Round = Vec<Placement>;

pub fn plan<R: Rng + ?Sized>(
    chunkservers: &[ChunkserverInfo],
    num_chunks: usize,
    replication_level: usize,
    rng: &mut R,
) -> Vec<Round> {
    let n = chunkservers.len();
    if n == 0 || num_chunks == 0 {
        return vec![Vec::new(); replication_level];
    }

    // uses[chunk][node index into `chunkservers`]
    let mut uses = vec![vec![0usize; n]; num_chunks];
    let mut order: Vec<usize> = (0..n).collect();
    let mut rounds = Vec::with_capacity(replication_level);

    for _ in 0..replication_level {
        order.shuffle(rng);

        let mut round = Vec::with_capacity(num_chunks);
        for (chunk, used) in uses.iter_mut().enumerate() {
            let start = chunk % n;
            let node = pick(&order, start, used);
            used[node] += 1;
            round.push(Placement {
                chunk_number: chunk as ChunkNumber,
                host: chunkservers[node].host.clone(),
            });
        }
        rounds.push(round);
    }

    rounds
}

/// Walk `order` from `start` and take the first node with the lowest use
/// count for this chunk. An unused node always wins.
fn pick(order: &[usize], start: usize, used: &[usize]) -> usize {
    let n = order.len();
    let mut best = order[start];
    for step in 0..n {
        let node = order[(start + step) % n];
        if used[node] == 0 {
            return node;
        }
        if used[node] < used[best] {
            best = node;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn nodes(n: usize) -> Vec<ChunkserverInfo> {
        (0..n).map(|i| ChunkserverInfo::new(format!("http://cs-{i}"))).collect()
    }

    fn hosts_for(rounds: &[Round], chunk: usize) -> Vec<&str> {
        rounds.iter().map(|r| r[chunk].host.as_str()).collect()
    }

    #[test]
    fn plans_r_times_k_placements() {
        let mut rng = StdRng::seed_from_u64(1);
        let rounds = plan(&nodes(4), 7, 3, &mut rng);
        assert_eq!(rounds.len(), 3);
        assert_eq!(rounds.iter().map(Vec::len).sum::<usize>(), 21);
        for round in &rounds {
            let numbers: Vec<_> = round.iter().map(|p| p.chunk_number).collect();
            assert_eq!(numbers, (0..7).collect::<Vec<_>>());
        }
    }

    #[test]
    fn replicas_are_distinct_when_pool_is_large_enough() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (pool, replication) in [(3, 3), (5, 3), (2, 2), (8, 4)] {
                let rounds = plan(&nodes(pool), 11, replication, &mut rng);
                for chunk in 0..11 {
                    let hosts = hosts_for(&rounds, chunk);
                    let distinct: HashSet<_> = hosts.iter().collect();
                    assert_eq!(distinct.len(), replication, "seed={seed} chunk={chunk}");
                }
            }
        }
    }

    #[test]
    fn small_pool_spreads_evenly() {
        let mut rng = StdRng::seed_from_u64(9);
        let rounds = plan(&nodes(2), 5, 5, &mut rng);
        for chunk in 0..5 {
            let hosts = hosts_for(&rounds, chunk);
            let on_first = hosts.iter().filter(|h| **h == "http://cs-0").count();
            assert!(on_first == 2 || on_first == 3, "chunk {chunk}: {hosts:?}");
        }
    }

    #[test]
    fn single_node_takes_everything() {
        let mut rng = StdRng::seed_from_u64(3);
        let rounds = plan(&nodes(1), 4, 2, &mut rng);
        assert!(rounds.iter().flatten().all(|p| p.host == "http://cs-0"));
        assert_eq!(rounds.iter().flatten().count(), 8);
    }

    #[test]
    fn same_seed_same_plan() {
        let a = plan(&nodes(6), 9, 3, &mut StdRng::seed_from_u64(77));
        let b = plan(&nodes(6), 9, 3, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }

    #[test]
    fn first_round_is_round_robin() {
        let rounds = plan(&nodes(3), 6, 1, &mut StdRng::seed_from_u64(5));
        let hosts = &rounds[0];
        for i in 0..3 {
            assert_eq!(hosts[i].host, hosts[i + 3].host);
        }
        let distinct: HashSet<_> = hosts[..3].iter().map(|p| &p.host).collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn empty_pool_plans_nothing() {
        let rounds = plan(&[], 3, 2, &mut StdRng::seed_from_u64(0));
        assert_eq!(rounds.len(), 2);
        assert!(rounds.iter().all(Vec::is_empty));
    }
}
