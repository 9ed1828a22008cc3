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

/// Parser for time-duration option strings like `30s` or `100 ms`.
///
/// Every result is expressed in milliseconds; sub-millisecond sources are
/// truncated. A missing unit means milliseconds.
pub struct TimeDuration;

#[derive(Clone, Copy)]
enum Scale {
    /// value * coefficient milliseconds
    Multiply(i64),
    /// value / coefficient milliseconds, truncating
    Divide(i64),
}

struct TimeUnit {
    units: &'static [&'static str],
    scale: Scale,
}

const ALL_UNITS: [TimeUnit; 7] = [
    TimeUnit {
        units: &["ns", "nano", "nanos", "nanosecond", "nanoseconds"],
        scale: Scale::Divide(1_000_000),
    },
    TimeUnit {
        units: &["us", "µs", "micro", "micros", "microsecond", "microseconds"],
        scale: Scale::Divide(1000),
    },
    TimeUnit {
        units: &["ms", "milli", "millis", "millisecond", "milliseconds"],
        scale: Scale::Multiply(1),
    },
    TimeUnit {
        units: &["s", "sec", "secs", "second", "seconds"],
        scale: Scale::Multiply(1000),
    },
    TimeUnit {
        units: &["min", "m", "minute", "minutes"],
        scale: Scale::Multiply(1000 * 60),
    },
    TimeUnit {
        units: &["h", "hour", "hours"],
        scale: Scale::Multiply(1000 * 60 * 60),
    },
    TimeUnit {
        units: &["d", "day", "days"],
        scale: Scale::Multiply(1000 * 60 * 60 * 24),
    },
];

impl TimeDuration {
    /// Parse the given text into a number of milliseconds.
    pub fn parse_millis(text: &str) -> Result<i64> {
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

        match Self::parse_unit(&unit)? {
            Scale::Multiply(coefficient) => {
                let maximum = i64::MAX / coefficient;
                if value > maximum {
                    return InvalidSnafu {
                        message: format!(
                            "The value '{text}' cannot be represented as 64bit number of milliseconds (numeric overflow)."
                        ),
                    }
                    .fail();
                }
                Ok(value * coefficient)
            }
            Scale::Divide(coefficient) => Ok(value / coefficient),
        }
    }

    fn parse_unit(unit: &str) -> Result<Scale> {
        if unit.is_empty() {
            // default to milliseconds
            return Ok(Scale::Multiply(1));
        }
        for time_unit in &ALL_UNITS {
            if time_unit.units.contains(&unit) {
                return Ok(time_unit.scale);
            }
        }
        InvalidSnafu {
            message: format!(
                "Time duration unit '{unit}' does not match any of the recognized units"
            ),
        }
        .fail()
    }
}
