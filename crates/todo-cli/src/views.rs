// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use todo_app::{TaskStore, ViewKind};
use todo_db::Store;
use todo_tui::{AddView, KeyMap, ListView, ViewModel};
use tracing::debug;

/// Builds a fresh model, backed by its own store connection, for each view
/// the chain visits. Views close their store on cleanup, so nothing is shared.
pub struct ViewFactory {
    db_path: PathBuf,
    keys: KeyMap,
}

impl ViewFactory {
    pub fn new(db_path: PathBuf, keys: KeyMap) -> Self {
        Self { db_path, keys }
    }

    pub fn open(&self, kind: ViewKind) -> Result<Box<dyn ViewModel>> {
        let store = self.open_store()?;
        debug!(view = kind.as_str(), db = %self.db_path.display(), "building view");
        match kind {
            ViewKind::List => {
                let view = ListView::new(store, self.keys.clone()).context("load tasks")?;
                Ok(Box::new(view))
            }
            ViewKind::Add => Ok(Box::new(AddView::new(store, self.keys.clone()))),
            ViewKind::None => bail!("no view to open"),
        }
    }

    fn open_store(&self) -> Result<Arc<dyn TaskStore>> {
        let store = Store::open(&self.db_path).with_context(|| {
            format!(
                "open database {} -- if this path is wrong, set [storage].db_path or TODO_DB",
                self.db_path.display()
            )
        })?;
        store.bootstrap()?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::ViewFactory;
    use anyhow::Result;
    use time::Duration;
    use todo_app::{TaskStore, ViewKind, local_midnight, local_today};
    use todo_db::Store;
    use todo_testkit::temp_db_path;
    use todo_tui::KeyMap;

    #[test]
    fn list_view_loads_tasks_from_the_database() -> Result<()> {
        let (_dir, path) = temp_db_path()?;
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.save_task("Write tests", local_midnight(local_today() + Duration::days(1)))?;
        store.close()?;

        let factory = ViewFactory::new(path, KeyMap::default());
        let view = factory.open(ViewKind::List)?;
        assert_eq!(view.kind(), ViewKind::List);
        assert!(view.err().is_none());
        Ok(())
    }

    #[test]
    fn add_view_bootstraps_a_new_database() -> Result<()> {
        let (_dir, path) = temp_db_path()?;
        let factory = ViewFactory::new(path.clone(), KeyMap::default());

        let mut view = factory.open(ViewKind::Add)?;
        assert_eq!(view.kind(), ViewKind::Add);
        view.cleanup();

        let store = Store::open(&path)?;
        store.bootstrap()?;
        assert!(store.get_tasks()?.is_empty());
        Ok(())
    }

    #[test]
    fn none_is_not_openable() -> Result<()> {
        let (_dir, path) = temp_db_path()?;
        let factory = ViewFactory::new(path, KeyMap::default());
        let error = match factory.open(ViewKind::None) {
            Ok(_) => anyhow::bail!("opening the none view should fail"),
            Err(error) => error,
        };
        assert!(error.to_string().contains("no view"));
        Ok(())
    }
}
