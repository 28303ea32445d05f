//! Opens the configured KV tree backend.

use std::sync::Arc;

use tracing::info;

use qcss_core::config::{CssBackend, CssConfig};
use qcss_css::CssAccess;
use qcss_kv::{KvTree, MemoryKvTree, RedbKvTree};

pub fn open_css(config: &CssConfig) -> anyhow::Result<CssAccess> {
    let kv: Arc<dyn KvTree> = match config.backend {
        CssBackend::Memory => {
            info!("using in-memory css, state is lost on exit");
            Arc::new(MemoryKvTree::new())
        }
        CssBackend::Redb => {
            let path = config.redb_path();
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let tree = RedbKvTree::open(&path)?;
            info!(path = ?path, "css opened");
            Arc::new(tree)
        }
    };
    Ok(CssAccess::new(kv))
}
