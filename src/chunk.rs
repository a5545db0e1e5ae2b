use std::num::NonZeroUsize;

use bytes::Bytes;

use crate::common::*;

pub type ChunkHash = [u8; 32];

pub struct ProtoChunk {
    pub number: ChunkNumber,
    pub data: Bytes,
    pub hash: ChunkHash,
}

// Chunk size is 1KB.
pub const CHUNK_SIZE_BYTES: usize = 1024;

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(CHUNK_SIZE_BYTES) {
    Some(size) => size,
    None => panic!("chunk size must be positive"),
};

/// Number of chunks needed to hold `len` bytes.
pub fn chunk_count(len: usize, chunk_size: NonZeroUsize) -> usize {
    len.div_ceil(chunk_size.get())
}

/// Split `data` into `chunk_size` slices. The last chunk holds the remainder
/// and is not padded. Empty input yields no chunks.
pub fn data_to_chunks(data: &Bytes, chunk_size: NonZeroUsize) -> Vec<ProtoChunk> {
    let num_chunks = chunk_count(data.len(), chunk_size);
    let chunk_size = chunk_size.get();
    let mut chunks = Vec::with_capacity(num_chunks);

    for i in 0..num_chunks {
        let start = i * chunk_size;
        let end = std::cmp::min(start + chunk_size, data.len());
        let chunk_data = data.slice(start..end);
        let hash = sha256sum(&chunk_data);
        chunks.push(ProtoChunk { number: i as ChunkNumber, data: chunk_data, hash });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn concat(chunks: &[ProtoChunk]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.data.iter().copied()).collect()
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(data_to_chunks(&Bytes::new(), DEFAULT_CHUNK_SIZE).is_empty());
    }

    #[test]
    fn chunk_lengths_follow_size() {
        let c = CHUNK_SIZE_BYTES;
        for n in [1, c, c + 1, 10 * c] {
            let data = Bytes::from((0..n).map(|i| (i % 251) as u8).collect::<Vec<_>>());
            let chunks = data_to_chunks(&data, size(c));

            assert_eq!(chunks.len(), n.div_ceil(c), "n={n}");
            let (last, full) = chunks.split_last().unwrap();
            assert!(full.iter().all(|ch| ch.data.len() == c));
            assert_eq!(last.data.len(), n - (chunks.len() - 1) * c);
            assert_eq!(concat(&chunks), data.to_vec());
        }
    }

    #[test]
    fn chunk_size_of_one_splits_every_byte() {
        let data = Bytes::from_static(b"abc");
        let chunks = data_to_chunks(&data, size(1));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunk_count(3, size(1)), 3);
    }

    #[test]
    fn chunks_are_numbered_in_order() {
        let data = Bytes::from(vec![7u8; 5 * 3 + 2]);
        let chunks = data_to_chunks(&data, size(5));
        let numbers: Vec<_> = chunks.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn arbitrary_bytes_survive() {
        // Invalid UTF-8 on purpose.
        let data = Bytes::from_static(&[0xff, 0xfe, 0x00, 0xc3, 0x28, 0x80, 0x00, 0xff, 0x01]);
        let chunks = data_to_chunks(&data, size(4));
        assert_eq!(chunks.len(), 3);
        assert_eq!(concat(&chunks), data.to_vec());
        assert_eq!(chunks[2].hash, sha256sum(&[0x01]));
    }
}
