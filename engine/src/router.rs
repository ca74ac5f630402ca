//! Category routing
//!
//! Maps an inbound event's category to its delivery target. Pure lookup
//! over configuration loaded once at startup; events whose category has no
//! target are rejected at submission and never reach a buffer.

use crate::error::EngineError;
use nippu_core::{Category, DeliveryTarget};
use std::collections::HashMap;

/// Category → delivery target lookup table
///
/// Built once from configuration and shared read-only across the engine.
#[derive(Debug, Default)]
pub struct CategoryRouter {
    targets: HashMap<Category, DeliveryTarget>,
}

impl CategoryRouter {
    /// Build a router from configured targets.
    ///
    /// A later target for the same category replaces an earlier one.
    pub fn new(targets: impl IntoIterator<Item = DeliveryTarget>) -> Self {
        Self {
            targets: targets
                .into_iter()
                .map(|target| (target.category, target))
                .collect(),
        }
    }

    /// Resolve the target for a category, rejecting unconfigured ones.
    pub fn route(&self, category: Category) -> Result<&DeliveryTarget, EngineError> {
        self.target(category)
            .ok_or(EngineError::Rejected(category))
    }

    /// Target for a category, if one is configured.
    pub fn target(&self, category: Category) -> Option<&DeliveryTarget> {
        self.targets.get(&category)
    }

    /// Configured categories, in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .into_iter()
            .filter(|category| self.targets.contains_key(category))
    }

    /// True when no category has a target.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
