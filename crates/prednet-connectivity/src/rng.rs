// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Reproducible random number generation.

Every (seed, connection type, worker) triple gets its own `StdRng` stream, so
re-running a worker with the same inputs reproduces its shard exactly and
workers never share generator state.
*/

use prednet_config::ConnectionType;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic RNG for one worker's share of one projection
pub fn worker_rng(seed: u64, conn_type: ConnectionType, rank: usize) -> StdRng {
    StdRng::seed_from_u64(stream_seed(seed, conn_type, rank))
}

/// RNG for single-stream utilities (matrix generation, shuffling)
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn stream_seed(seed: u64, conn_type: ConnectionType, rank: usize) -> u64 {
    let type_index = match conn_type {
        ConnectionType::Ee => 0u64,
        ConnectionType::Ei => 1,
        ConnectionType::Ie => 2,
        ConnectionType::Ii => 3,
    };
    // splitmix64 finalizer over the packed triple
    let mut z = seed
        .wrapping_add((rank as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(type_index.wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_triple_same_stream() {
        let a: Vec<f64> = (0..8)
            .map({
                let mut rng = worker_rng(42, ConnectionType::Ii, 1);
                move |_| rng.gen()
            })
            .collect();
        let b: Vec<f64> = (0..8)
            .map({
                let mut rng = worker_rng(42, ConnectionType::Ii, 1);
                move |_| rng.gen()
            })
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_streams_differ_by_rank_and_type() {
        let base = stream_seed(42, ConnectionType::Ee, 0);
        assert_ne!(base, stream_seed(42, ConnectionType::Ee, 1));
        assert_ne!(base, stream_seed(42, ConnectionType::Ei, 0));
        assert_ne!(base, stream_seed(43, ConnectionType::Ee, 0));
    }
}
