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

use crate::error::*;

/// Default seed of the reference JVM implementation.
pub const DEFAULT_SEED: i32 = 42;

const C1: i32 = 0xcc9e2d51u32 as i32;
const C2: i32 = 0x1b873593;

/// Murmur3-style hash over whole little-endian 32-bit words, matching the
/// JVM `MurmurHashUtils.hashBytesByWords`. The input length must be a
/// multiple of four.
pub fn hash_bytes_by_words(bytes: &[u8], seed: i32) -> Result<i32> {
    if bytes.len() % 4 != 0 {
        return InvalidSnafu {
            message: format!(
                "word-wise hash requires a multiple of 4 bytes, got {}",
                bytes.len()
            ),
        }
        .fail();
    }
    let mut h1 = seed;
    for chunk in bytes.chunks_exact(4) {
        let word = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h1 = mix_h1(h1, mix_k1(word));
    }
    Ok(fmix(h1, bytes.len() as i32))
}

fn mix_k1(mut k1: i32) -> i32 {
    k1 = k1.wrapping_mul(C1);
    k1 = k1.rotate_left(15);
    k1.wrapping_mul(C2)
}

fn mix_h1(mut h1: i32, k1: i32) -> i32 {
    h1 ^= k1;
    h1 = h1.rotate_left(13);
    h1.wrapping_mul(5).wrapping_add(0xe6546b64u32 as i32)
}

fn fmix(mut h1: i32, length: i32) -> i32 {
    h1 ^= length;
    h1 ^= ((h1 as u32) >> 16) as i32;
    h1 = h1.wrapping_mul(0x85ebca6bu32 as i32);
    h1 ^= ((h1 as u32) >> 13) as i32;
    h1 = h1.wrapping_mul(0xc2b2ae35u32 as i32);
    h1 ^= ((h1 as u32) >> 16) as i32;
    h1
}
