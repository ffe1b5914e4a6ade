use crate::error::{Result, StoreError};
use crate::store::Store;
use crate::validation;

/// Scoped transaction on a store.
///
/// Begins on construction; rolls back on drop unless [`commit`] or
/// [`rollback`] ran first. Double-commit, commit-after-rollback and
/// rollback-after-commit raise `InternalError`; a second rollback is a
/// no-op.
///
/// [`commit`]: Transaction::commit
/// [`rollback`]: Transaction::rollback
pub struct Transaction<'a> {
    store: &'a Store,
    committed: bool,
    rolled_back: bool,
}

impl<'a> Transaction<'a> {
    pub fn new(store: &'a Store) -> Result<Self> {
        store.begin_transaction()?;
        Ok(Transaction {
            store,
            committed: false,
            rolled_back: false,
        })
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.committed {
            return Err(StoreError::internal("transaction already committed"));
        }
        if self.rolled_back {
            return Err(StoreError::internal("transaction already rolled back"));
        }
        self.store.commit()?;
        self.committed = true;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if self.committed {
            return Err(StoreError::internal("cannot roll back a committed transaction"));
        }
        if self.rolled_back {
            return Ok(());
        }
        self.store.rollback()?;
        self.rolled_back = true;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.committed && !self.rolled_back
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.store.rollback() {
                log::warn!("failed to roll back transaction on drop: {e}");
            }
            self.rolled_back = true;
        }
    }
}

/// Named savepoint inside a transaction.
///
/// Released on drop unless rolled back first; rolling back undoes only the
/// changes made after the savepoint was created.
pub struct Savepoint<'a> {
    store: &'a Store,
    name: String,
    released: bool,
    rolled_back: bool,
}

impl<'a> Savepoint<'a> {
    pub fn new(store: &'a Store, name: &str) -> Result<Self> {
        validation::validate_identifier(name, "savepoint name")?;
        store.engine().savepoint(name)?;
        Ok(Savepoint {
            store,
            name: name.to_string(),
            released: false,
            rolled_back: false,
        })
    }

    /// Undo every change made since the savepoint was created.
    pub fn rollback(&mut self) -> Result<()> {
        if self.released {
            return Err(StoreError::internal("cannot roll back a released savepoint"));
        }
        if self.rolled_back {
            return Ok(());
        }
        self.store.engine().rollback_to_savepoint(&self.name)?;
        self.store.engine().release_savepoint(&self.name)?;
        self.rolled_back = true;
        Ok(())
    }

    /// Keep the changes (within the enclosing transaction) and discard the
    /// savepoint.
    pub fn release(&mut self) -> Result<()> {
        if self.rolled_back {
            return Err(StoreError::internal("cannot release a rolled back savepoint"));
        }
        if self.released {
            return Ok(());
        }
        self.store.engine().release_savepoint(&self.name)?;
        self.released = true;
        Ok(())
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        if !self.released && !self.rolled_back {
            if let Err(e) = self.store.engine().release_savepoint(&self.name) {
                log::warn!("failed to release savepoint '{}' on drop: {e}", self.name);
            }
            self.released = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::store::{Store, StoreOptions};

    const SCHEMA: &str = "CREATE TABLE Plant (id INTEGER PRIMARY KEY, label TEXT NOT NULL UNIQUE, capacity REAL);";

    fn test_store() -> Store {
        let store = Store::open(":memory:", StoreOptions::default()).unwrap();
        store.apply_schema_text(SCHEMA).unwrap();
        store
    }

    #[test]
    fn test_commit_persists() {
        let store = test_store();
        {
            let mut txn = Transaction::new(&store).unwrap();
            store
                .create_element("Plant", &Element::new().set("label", "P1"))
                .unwrap();
            txn.commit().unwrap();
        }
        assert_eq!(store.get_element_ids("Plant").unwrap().len(), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let store = test_store();
        {
            let _txn = Transaction::new(&store).unwrap();
            store
                .create_element("Plant", &Element::new().set("label", "P1"))
                .unwrap();
            // Guard dropped without commit.
        }
        assert!(store.get_element_ids("Plant").unwrap().is_empty());
    }

    #[test]
    fn test_rollback_on_user_error() {
        let store = test_store();
        let result: crate::error::Result<()> = (|| {
            let mut txn = Transaction::new(&store)?;
            store.create_element("Plant", &Element::new().set("label", "P1"))?;
            // Fails with DuplicateElement before the commit is reached.
            store.create_element("Plant", &Element::new().set("label", "P1"))?;
            txn.commit()
        })();
        assert!(result.is_err());
        assert!(store.get_element_ids("Plant").unwrap().is_empty());
    }

    #[test]
    fn test_double_commit_is_internal_error() {
        let store = test_store();
        let mut txn = Transaction::new(&store).unwrap();
        txn.commit().unwrap();
        let err = txn.commit().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InternalError);
    }

    #[test]
    fn test_rollback_after_commit_is_internal_error() {
        let store = test_store();
        let mut txn = Transaction::new(&store).unwrap();
        txn.commit().unwrap();
        assert!(txn.rollback().is_err());
    }

    #[test]
    fn test_commit_after_rollback_is_internal_error() {
        let store = test_store();
        let mut txn = Transaction::new(&store).unwrap();
        txn.rollback().unwrap();
        assert!(txn.commit().is_err());
        // A second rollback stays a no-op.
        txn.rollback().unwrap();
    }

    #[test]
    fn test_savepoint_partial_rollback() {
        let store = test_store();
        let mut txn = Transaction::new(&store).unwrap();
        store
            .create_element("Plant", &Element::new().set("label", "P1"))
            .unwrap();

        {
            let mut sp = Savepoint::new(&store, "sp1").unwrap();
            store
                .create_element("Plant", &Element::new().set("label", "P2"))
                .unwrap();
            sp.rollback().unwrap();
        }

        store
            .create_element("Plant", &Element::new().set("label", "P3"))
            .unwrap();
        txn.commit().unwrap();

        let labels = store.read_scalar("Plant", "label").unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_savepoint_release_keeps_changes() {
        let store = test_store();
        let mut txn = Transaction::new(&store).unwrap();
        {
            let _sp = Savepoint::new(&store, "sp1").unwrap();
            store
                .create_element("Plant", &Element::new().set("label", "P1"))
                .unwrap();
            // Released on drop.
        }
        txn.commit().unwrap();
        assert_eq!(store.get_element_ids("Plant").unwrap().len(), 1);
    }

    #[test]
    fn test_savepoint_invalid_name_rejected() {
        let store = test_store();
        let _txn = Transaction::new(&store).unwrap();
        assert!(Savepoint::new(&store, "bad name").is_err());
        assert!(Savepoint::new(&store, "").is_err());
    }
}
