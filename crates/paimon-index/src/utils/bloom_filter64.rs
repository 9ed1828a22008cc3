// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// Bloom filter over 64-bit hashes.
///
/// The probe sequence splits the hash into two signed 32-bit halves and walks
/// `h1 + i * h2` for `i = 1..=num_hash_functions` in wrapping arithmetic,
/// flipping negative combined hashes bitwise. This matches the reference JVM
/// implementation bit for bit, including its use of signed modulo.
#[derive(Debug)]
pub struct BloomFilter64 {
    num_bits: i32,
    num_hash_functions: i32,
    bit_set: BitSet,
}

/// Byte-backed bit set; bit `i` lives in byte `i >> 3` at bit `i & 7`.
#[derive(Debug)]
pub struct BitSet {
    bytes: Vec<u8>,
}

impl BitSet {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn set(&mut self, index: i32) {
        self.bytes[(index as u32 >> 3) as usize] |= 1u8 << (index & 0x07);
    }

    pub fn get(&self, index: i32) -> bool {
        self.bytes[(index as u32 >> 3) as usize] & (1u8 << (index & 0x07)) != 0
    }

    pub fn bit_size(&self) -> i32 {
        (self.bytes.len() * 8) as i32
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl BloomFilter64 {
    /// Size a fresh filter for `items` entries at the target false-positive
    /// rate, rounding the bit count up to a byte boundary.
    pub fn with_expected_items(items: i64, fpp: f64) -> Self {
        let nb = (-(items as f64) * fpp.ln() / (2f64.ln() * 2f64.ln())) as i32;
        let num_bits = nb + (8 - nb % 8);
        let num_hash_functions =
            std::cmp::max(1, (num_bits as f64 / items as f64 * 2f64.ln()).round() as i32);
        Self {
            num_bits,
            num_hash_functions,
            bit_set: BitSet::new(vec![0u8; (num_bits / 8) as usize]),
        }
    }

    /// Wrap an existing bit set read from storage.
    pub fn from_existing(num_hash_functions: i32, bit_set: BitSet) -> Self {
        Self {
            num_bits: bit_set.bit_size(),
            num_hash_functions,
            bit_set,
        }
    }

    pub fn num_hash_functions(&self) -> i32 {
        self.num_hash_functions
    }

    pub fn bit_set(&self) -> &BitSet {
        &self.bit_set
    }

    pub fn add_hash(&mut self, hash64: i64) {
        let hash1 = hash64 as i32;
        let hash2 = ((hash64 as u64) >> 32) as i32;

        for i in 1..=self.num_hash_functions {
            let mut combined_hash = hash1.wrapping_add(i.wrapping_mul(hash2));
            // hashcode should be positive, flip all the bits if it's negative
            if combined_hash < 0 {
                combined_hash = !combined_hash;
            }
            let pos = combined_hash % self.num_bits;
            self.bit_set.set(pos);
        }
    }

    pub fn test_hash(&self, hash64: i64) -> bool {
        let hash1 = hash64 as i32;
        let hash2 = ((hash64 as u64) >> 32) as i32;

        for i in 1..=self.num_hash_functions {
            let mut combined_hash = hash1.wrapping_add(i.wrapping_mul(hash2));
            // hashcode should be positive, flip all the bits if it's negative
            if combined_hash < 0 {
                combined_hash = !combined_hash;
            }
            let pos = combined_hash % self.num_bits;
            if !self.bit_set.get(pos) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod bloom_filter64_tests {
    use super::*;

    #[test]
    fn test_bit_set() {
        let mut bit_set = BitSet::new(vec![0u8; 4]);
        assert_eq!(bit_set.bit_size(), 32);
        bit_set.set(0);
        bit_set.set(7);
        bit_set.set(8);
        bit_set.set(31);
        assert!(bit_set.get(0));
        assert!(bit_set.get(7));
        assert!(bit_set.get(8));
        assert!(bit_set.get(31));
        assert!(!bit_set.get(1));
        assert_eq!(bit_set.as_bytes(), &[0b1000_0001, 0b0000_0001, 0, 0b1000_0000]);
    }

    #[test]
    fn test_added_hashes_are_found() {
        let mut filter = BloomFilter64::with_expected_items(1000, 0.01);
        let hashes: Vec<i64> = (0..1000)
            .map(|i| (i as i64).wrapping_mul(0x9e3779b97f4a7c15u64 as i64))
            .collect();
        for hash in &hashes {
            filter.add_hash(*hash);
        }
        for hash in &hashes {
            assert!(filter.test_hash(*hash));
        }
    }

    #[test]
    fn test_false_positive_rate_is_bounded() {
        let items = 10_000i64;
        let fpp = 0.02;
        let mut filter = BloomFilter64::with_expected_items(items, fpp);
        for i in 0..items {
            filter.add_hash(i.wrapping_mul(0x517cc1b727220a95u64 as i64));
        }
        let mut false_positives = 0;
        let probes = 10_000;
        for i in items..items + probes {
            if filter.test_hash(i.wrapping_mul(0x517cc1b727220a95u64 as i64)) {
                false_positives += 1;
            }
        }
        // generous noise margin over the configured rate
        assert!((false_positives as f64) < probes as f64 * (fpp * 3.0));
    }

    #[test]
    fn test_sizing_matches_reference_formula() {
        let filter = BloomFilter64::with_expected_items(1000, 0.01);
        // -1000 * ln(0.01) / ln(2)^2 = 9584.9..., truncated and padded to 9592
        assert_eq!(filter.bit_set().bit_size(), 9592);
        assert_eq!(filter.num_hash_functions(), 7);
    }
}
