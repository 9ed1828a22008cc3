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

use std::fmt::{Debug, Formatter};

use roaring::RoaringBitmap;

use crate::error::*;

/// Verdict of one index evaluation for one data file.
///
/// `Skip` proves the file holds no matching rows; `Remain` means the index
/// cannot exclude the file; `Bitmap` carries a deferred row-id bitmap so that
/// `AND`/`OR` folding happens before any body deserialization runs.
pub enum FileIndexResult {
    Remain,
    Skip,
    Bitmap(BitmapIndexResult),
}

/// A lazily produced row-id bitmap.
pub struct BitmapIndexResult {
    supplier: Box<dyn FnOnce() -> Result<RoaringBitmap> + Send>,
}

impl BitmapIndexResult {
    pub fn new(supplier: Box<dyn FnOnce() -> Result<RoaringBitmap> + Send>) -> Self {
        Self { supplier }
    }

    pub fn from_bitmap(bitmap: RoaringBitmap) -> Self {
        Self {
            supplier: Box::new(move || Ok(bitmap)),
        }
    }

    /// Run the deferred computation.
    pub fn force(self) -> Result<RoaringBitmap> {
        (self.supplier)()
    }
}

impl FileIndexResult {
    /// True unless the file is proven skippable without forcing anything.
    pub fn remain(&self) -> bool {
        !matches!(self, FileIndexResult::Skip)
    }

    /// Resolve to a concrete row-id bitmap where one is available.
    pub fn to_row_ids(self) -> Result<Option<RoaringBitmap>> {
        match self {
            FileIndexResult::Remain | FileIndexResult::Skip => Ok(None),
            FileIndexResult::Bitmap(bitmap) => bitmap.force().map(Some),
        }
    }

    /// Conjunction: `Skip` absorbs, `Remain` is the identity, two bitmaps
    /// intersect lazily.
    pub fn and(self, other: FileIndexResult) -> FileIndexResult {
        match (self, other) {
            (FileIndexResult::Skip, _) | (_, FileIndexResult::Skip) => FileIndexResult::Skip,
            (FileIndexResult::Remain, other) => other,
            (this, FileIndexResult::Remain) => this,
            (FileIndexResult::Bitmap(left), FileIndexResult::Bitmap(right)) => {
                FileIndexResult::Bitmap(BitmapIndexResult::new(Box::new(move || {
                    Ok(left.force()? & right.force()?)
                })))
            }
        }
    }

    /// Disjunction: `Remain` absorbs, `Skip` is the identity, two bitmaps
    /// union lazily.
    pub fn or(self, other: FileIndexResult) -> FileIndexResult {
        match (self, other) {
            (FileIndexResult::Remain, _) | (_, FileIndexResult::Remain) => FileIndexResult::Remain,
            (FileIndexResult::Skip, other) => other,
            (this, FileIndexResult::Skip) => this,
            (FileIndexResult::Bitmap(left), FileIndexResult::Bitmap(right)) => {
                FileIndexResult::Bitmap(BitmapIndexResult::new(Box::new(move || {
                    Ok(left.force()? | right.force()?)
                })))
            }
        }
    }
}

impl Debug for FileIndexResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileIndexResult::Remain => write!(f, "Remain"),
            FileIndexResult::Skip => write!(f, "Skip"),
            FileIndexResult::Bitmap(_) => write!(f, "Bitmap(<lazy>)"),
        }
    }
}
