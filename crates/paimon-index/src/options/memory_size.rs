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

/// Parser for memory-size option strings like `16kb` or `4 mb`.
///
/// The accepted grammar is `<digits><optional-unit>` where the unit is one of
/// the byte/kibi/mebi/gibi/tebi spellings below, case-insensitive and
/// whitespace-tolerant. A missing unit means bytes.
pub struct MemorySize;

struct MemoryUnit {
    units: &'static [&'static str],
    multiplier: i64,
}

const BYTES: MemoryUnit = MemoryUnit {
    units: &["b", "bytes"],
    multiplier: 1,
};
const KILO_BYTES: MemoryUnit = MemoryUnit {
    units: &["k", "kb", "kibibytes"],
    multiplier: 1024,
};
const MEGA_BYTES: MemoryUnit = MemoryUnit {
    units: &["m", "mb", "mebibytes"],
    multiplier: 1024 * 1024,
};
const GIGA_BYTES: MemoryUnit = MemoryUnit {
    units: &["g", "gb", "gibibytes"],
    multiplier: 1024 * 1024 * 1024,
};
const TERA_BYTES: MemoryUnit = MemoryUnit {
    units: &["t", "tb", "tebibytes"],
    multiplier: 1024 * 1024 * 1024 * 1024,
};

const ALL_UNITS: [MemoryUnit; 5] = [BYTES, KILO_BYTES, MEGA_BYTES, GIGA_BYTES, TERA_BYTES];

impl MemorySize {
    /// Parse the given text into a number of bytes.
    pub fn parse_bytes(text: &str) -> Result<i64> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return InvalidSnafu {
                message: "argument is an empty or whitespace-only string".to_string(),
            }
            .fail();
        }

        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let number = &trimmed[..digits_end];
        if number.is_empty() {
            return InvalidSnafu {
                message: "text does not start with a number".to_string(),
            }
            .fail();
        }
        let unit = trimmed[digits_end..].trim().to_lowercase();

        let value = number.parse::<i64>().map_err(|_| Error::Invalid {
            message: format!(
                "The value '{number}' cannot be represented as 64bit number (numeric overflow)."
            ),
        })?;
        let multiplier = Self::parse_unit(&unit)?;

        let maximum = i64::MAX / multiplier;
        if value > maximum {
            return InvalidSnafu {
                message: format!(
                    "The value '{text}' cannot be represented as 64bit number of bytes (numeric overflow)."
                ),
            }
            .fail();
        }
        Ok(value * multiplier)
    }

    fn parse_unit(unit: &str) -> Result<i64> {
        if unit.is_empty() {
            return Ok(BYTES.multiplier);
        }
        for memory_unit in &ALL_UNITS {
            if memory_unit.units.contains(&unit) {
                return Ok(memory_unit.multiplier);
            }
        }
        InvalidSnafu {
            message: format!(
                "Memory size unit '{unit}' does not match any of the recognized units"
            ),
        }
        .fail()
    }
}

#[cfg(test)]
mod memory_size_tests {
    use super::*;

    #[test]
    fn test_parse_without_unit() {
        assert_eq!(MemorySize::parse_bytes("0").unwrap(), 0);
        assert_eq!(MemorySize::parse_bytes("16384").unwrap(), 16384);
        assert_eq!(MemorySize::parse_bytes("  42  ").unwrap(), 42);
    }

    #[test]
    fn test_parse_with_unit() {
        assert_eq!(MemorySize::parse_bytes("1b").unwrap(), 1);
        assert_eq!(MemorySize::parse_bytes("10 bytes").unwrap(), 10);
        assert_eq!(MemorySize::parse_bytes("16k").unwrap(), 16 * 1024);
        assert_eq!(MemorySize::parse_bytes("16KB").unwrap(), 16 * 1024);
        assert_eq!(MemorySize::parse_bytes("2 kibibytes").unwrap(), 2048);
        assert_eq!(MemorySize::parse_bytes("3m").unwrap(), 3 * 1024 * 1024);
        assert_eq!(MemorySize::parse_bytes("3 Mb").unwrap(), 3 * 1024 * 1024);
        assert_eq!(MemorySize::parse_bytes("1g").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(MemorySize::parse_bytes("2 gibibytes").unwrap(), 2i64 << 30);
        assert_eq!(MemorySize::parse_bytes("1tb").unwrap(), 1i64 << 40);
        assert_eq!(MemorySize::parse_bytes("4 TEBIBYTES").unwrap(), 4i64 << 40);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(MemorySize::parse_bytes("").is_err());
        assert!(MemorySize::parse_bytes("   ").is_err());
        assert!(MemorySize::parse_bytes("kb").is_err());
        assert!(MemorySize::parse_bytes("-16kb").is_err());
        assert!(MemorySize::parse_bytes("16 lightyears").is_err());
        // 2^63 does not fit into i64
        assert!(MemorySize::parse_bytes("9223372036854775808").is_err());
        // fits as a number but overflows when scaled to bytes
        assert!(MemorySize::parse_bytes("9223372036854775807tb").is_err());
    }
}
