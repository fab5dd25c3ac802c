//! Catalog — read-only snapshots of the compiled strategies.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::model::{Strategy, StrategyConfig};

/// An immutable view of every strategy at one point in time.
pub type StrategySnapshot = Arc<Vec<Arc<Strategy>>>;

/// Source of strategies for the workers. Queried once per line; implementors
/// must hand out cheap snapshots and never block for long.
pub trait StrategyCatalog: Send + Sync {
    fn get_all(&self) -> StrategySnapshot;
}

/// In-memory catalog. `replace` swaps the whole snapshot, so readers holding
/// the previous one are unaffected.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    snapshot: RwLock<StrategySnapshot>,
}

impl StaticCatalog {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(strategies.into_iter().map(Arc::new).collect())),
        }
    }

    pub fn from_configs(configs: &[StrategyConfig]) -> Self {
        let catalog = Self::new(configs.iter().map(StrategyConfig::compile).collect());
        let snapshot = catalog.get_all();
        info!(
            "Loaded {} strategies ({} compiled)",
            snapshot.len(),
            snapshot.iter().filter(|s| s.parse_succ).count()
        );
        catalog
    }

    pub fn replace(&self, strategies: Vec<Strategy>) {
        let next = Arc::new(strategies.into_iter().map(Arc::new).collect());
        *self.snapshot.write() = next;
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }
}

impl StrategyCatalog for StaticCatalog {
    fn get_all(&self) -> StrategySnapshot {
        Arc::clone(&self.snapshot.read())
    }
}
