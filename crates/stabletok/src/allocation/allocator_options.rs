//! Stable ID Allocator Options

use serde::{Deserialize, Serialize};

use crate::vocab::{CategoryPolicy, CategoryRanges};

/// Options for configuring a [`StableIdAllocator`](super::StableIdAllocator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorOptions {
    /// The reserved id range of each category.
    pub ranges: CategoryRanges,

    /// The categorization rules.
    pub policy: CategoryPolicy,
}

impl AllocatorOptions {
    /// Get the category ranges.
    pub fn ranges(&self) -> &CategoryRanges {
        &self.ranges
    }

    /// Set the category ranges.
    pub fn set_ranges(
        &mut self,
        ranges: CategoryRanges,
    ) {
        self.ranges = ranges;
    }

    /// Set the category ranges, and return the builder.
    pub fn with_ranges(
        mut self,
        ranges: CategoryRanges,
    ) -> Self {
        self.set_ranges(ranges);
        self
    }

    /// Get the categorization policy.
    pub fn policy(&self) -> &CategoryPolicy {
        &self.policy
    }

    /// Set the categorization policy.
    pub fn set_policy(
        &mut self,
        policy: CategoryPolicy,
    ) {
        self.policy = policy;
    }

    /// Set the categorization policy, and return the builder.
    pub fn with_policy(
        mut self,
        policy: CategoryPolicy,
    ) -> Self {
        self.set_policy(policy);
        self
    }
}
