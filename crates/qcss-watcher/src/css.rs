//! WatcherCss — snapshot of every database and table status.
//!
//! Other processes edit the tree while we walk it. A node that vanishes
//! between listing and reading is left out of the result.

use std::collections::BTreeMap;

use tracing::debug;

use qcss_core::layout::{self, DBS};
use qcss_css::CssAccess;

use crate::error::WatcherResult;

#[derive(Clone)]
pub struct WatcherCss {
    css: CssAccess,
}

impl WatcherCss {
    pub fn new(css: CssAccess) -> Self {
        Self { css }
    }

    pub fn css(&self) -> &CssAccess {
        &self.css
    }

    /// Database name → raw status, for every child of `/DBS`.
    pub fn get_dbs(&self) -> WatcherResult<BTreeMap<String, String>> {
        let kv = self.css.kv();
        let mut dbs = BTreeMap::new();
        let Some(names) = kv.children_or_none(DBS)? else {
            return Ok(dbs);
        };
        for db in names {
            match kv.get_or_none(&layout::db_path(&db))? {
                Some(status) => {
                    dbs.insert(db, status);
                }
                None => debug!(%db, "database vanished during listing"),
            }
        }
        Ok(dbs)
    }

    /// (database, table) → raw status, for every database with a
    /// `TABLES` node.
    pub fn get_tables(&self) -> WatcherResult<BTreeMap<(String, String), String>> {
        let kv = self.css.kv();
        let mut tables = BTreeMap::new();
        let Some(dbs) = kv.children_or_none(DBS)? else {
            return Ok(tables);
        };
        for db in dbs {
            let Some(names) = kv.children_or_none(&layout::tables_path(&db))? else {
                continue;
            };
            for table in names {
                match kv.get_or_none(&layout::table_path(&db, &table))? {
                    Some(status) => {
                        tables.insert((db.clone(), table), status);
                    }
                    None => debug!(%db, %table, "table vanished during listing"),
                }
            }
        }
        Ok(tables)
    }
}
