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

use opendal::{Operator, Scheme};

use crate::error::Error;

/// The storage carries all supported storage services in paimon-index.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Storage {
    #[cfg(feature = "storage-memory")]
    Memory,
    #[cfg(feature = "storage-fs")]
    LocalFs,
}

impl Storage {
    pub(crate) fn build(scheme_str: &str) -> crate::Result<Self> {
        let scheme = Self::parse_scheme(scheme_str)?;

        match scheme {
            #[cfg(feature = "storage-memory")]
            Scheme::Memory => Ok(Self::Memory),
            #[cfg(feature = "storage-fs")]
            Scheme::Fs => Ok(Self::LocalFs),
            _ => Err(Error::IoUnsupported {
                message: format!("Unsupported storage scheme {scheme_str}"),
            }),
        }
    }

    pub(crate) fn create_operator(&self) -> crate::Result<Operator> {
        match self {
            #[cfg(feature = "storage-memory")]
            Storage::Memory => {
                let op = Operator::new(opendal::services::Memory::default())?.finish();
                Ok(op)
            }
            #[cfg(feature = "storage-fs")]
            Storage::LocalFs => {
                let op = Operator::new(opendal::services::Fs::default().root("/"))?.finish();
                Ok(op)
            }
        }
    }

    /// Strip the scheme part so that the remainder is a path relative to the
    /// operator root.
    pub(crate) fn relative_path<'a>(&self, path: &'a str) -> &'a str {
        match self {
            #[cfg(feature = "storage-memory")]
            Storage::Memory => {
                if let Some(stripped) = path.strip_prefix("memory:/") {
                    stripped
                } else {
                    path.strip_prefix('/').unwrap_or(path)
                }
            }
            #[cfg(feature = "storage-fs")]
            Storage::LocalFs => {
                if let Some(stripped) = path.strip_prefix("file:/") {
                    stripped
                } else {
                    path.strip_prefix('/').unwrap_or(path)
                }
            }
        }
    }

    fn parse_scheme(scheme: &str) -> crate::Result<Scheme> {
        match scheme {
            "memory" => Ok(Scheme::Memory),
            "file" | "" => Ok(Scheme::Fs),
            s => Ok(s.parse::<Scheme>()?),
        }
    }
}
