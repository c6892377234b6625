// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Two-level ordered collections of values or tokens.
//!
//! A batch is an ordered list of groups, each an ordered list of items. The
//! server answers a batch request with a batch of identical shape, so item
//! `i` of group `g` in the response belongs to item `i` of group `g` in the
//! request.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of items in each group of a batch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchShape(Vec<usize>);

impl BatchShape {
    pub fn groups(&self) -> &[usize] {
        &self.0
    }

    pub fn item_count(&self) -> usize {
        self.0.iter().sum()
    }
}

impl fmt::Debug for BatchShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for BatchShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Batch shape mismatch: expected {expected}, got {actual}")]
pub struct ShapeMismatch {
    pub expected: BatchShape,
    pub actual: BatchShape,
}

/// Ordered list of groups of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch<T>(Vec<Vec<T>>);

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Batch<T> {
    pub fn new(groups: Vec<Vec<T>>) -> Self {
        Self(groups)
    }

    pub fn shape(&self) -> BatchShape {
        BatchShape(self.0.iter().map(Vec::len).collect())
    }

    pub fn groups(&self) -> &[Vec<T>] {
        &self.0
    }

    pub fn into_groups(self) -> Vec<Vec<T>> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }

    pub fn get(&self, group: usize, item: usize) -> Option<&T> {
        self.0.get(group)?.get(item)
    }

    /// Iterates over all items in group-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter().flatten()
    }

    /// Applies `f` to every item, keeping group and item positions.
    ///
    /// Stops at the first error; no partially mapped batch is returned.
    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<Batch<U>, E> {
        let groups = self
            .0
            .iter()
            .map(|group| group.iter().map(&mut f).collect::<Result<Vec<_>, E>>())
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Batch(groups))
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Batch<U> {
        Batch(
            self.0
                .into_iter()
                .map(|group| group.into_iter().map(&mut f).collect())
                .collect(),
        )
    }

    /// Checks that this batch has the same shape as `expected`.
    pub fn ensure_shape(&self, expected: &BatchShape) -> Result<(), ShapeMismatch> {
        let actual = self.shape();
        if &actual != expected {
            return Err(ShapeMismatch {
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    }
}

impl<T> From<Vec<Vec<T>>> for Batch<T> {
    fn from(groups: Vec<Vec<T>>) -> Self {
        Self(groups)
    }
}

impl<T> From<Batch<T>> for Vec<Vec<T>> {
    fn from(batch: Batch<T>) -> Self {
        batch.0
    }
}

impl<T> FromIterator<Vec<T>> for Batch<T> {
    fn from_iter<I: IntoIterator<Item = Vec<T>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
