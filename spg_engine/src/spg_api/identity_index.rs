//! Maps every alias a rail issues for a payment attempt back to the one order it belongs to.
//!
//! Registration is write-once per alias: `set_if_absent` on `alias:<alias>` makes the first binding win, and an
//! attempt to bind the alias to another order is refused with an [`AliasConflictError`]. The reverse list
//! (`order-aliases:<order id>`) is what the status cache uses to find sibling aliases.
use std::time::Duration;

use log::*;

use crate::{
    order_types::{Alias, OrderId},
    spg_api::{
        errors::{AliasConflictError, IdentityIndexError, StorageError},
        keys::{alias_key, order_aliases_key, MAX_CAS_ATTEMPTS},
    },
    traits::KeyValueStore,
};

#[derive(Clone)]
pub struct IdentityIndex<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> IdentityIndex<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Binds `alias` to `order_id`. Registering the same pair twice is a no-op.
    pub async fn register(&self, alias: &Alias, order_id: &OrderId) -> Result<(), IdentityIndexError> {
        let key = alias_key(alias);
        let existing =
            self.store.set_if_absent(&key, order_id.as_str(), self.ttl).await.map_err(StorageError::backend)?;
        match existing {
            None => debug!("🪪️ Alias {alias} registered for order {order_id}"),
            Some(bound) if bound == order_id.as_str() => trace!("🪪️ Alias {alias} is already registered to {order_id}"),
            Some(bound) => {
                let err = AliasConflictError { alias: alias.clone(), existing: OrderId(bound), requested: order_id.clone() };
                error!("🪪️ {err}");
                return Err(err.into());
            },
        }
        self.append_reverse_entry(order_id, alias).await?;
        Ok(())
    }

    pub async fn resolve(&self, alias: &Alias) -> Result<Option<OrderId>, IdentityIndexError> {
        let order_id = self.store.get(&alias_key(alias)).await.map_err(StorageError::backend)?;
        Ok(order_id.map(OrderId))
    }

    /// Every alias registered for the order so far, in registration order.
    pub async fn aliases_for(&self, order_id: &OrderId) -> Result<Vec<Alias>, IdentityIndexError> {
        let key = order_aliases_key(order_id);
        let current = self.store.get(&key).await.map_err(StorageError::backend)?;
        Ok(parse_alias_list(&key, current.as_deref())?)
    }

    /// Resolves the alias and returns every alias of the same order, including `alias` itself.
    pub async fn siblings_of(&self, alias: &Alias) -> Result<Vec<Alias>, IdentityIndexError> {
        match self.resolve(alias).await? {
            Some(order_id) => self.aliases_for(&order_id).await,
            None => Ok(vec![alias.clone()]),
        }
    }

    async fn append_reverse_entry(&self, order_id: &OrderId, alias: &Alias) -> Result<(), StorageError> {
        let key = order_aliases_key(order_id);
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.store.get(&key).await.map_err(StorageError::backend)?;
            let mut aliases = parse_alias_list(&key, current.as_deref())?;
            if aliases.contains(alias) {
                return Ok(());
            }
            aliases.push(alias.clone());
            let updated = serde_json::to_string(&aliases)
                .map_err(|e| StorageError::Corrupt { key: key.clone(), reason: e.to_string() })?;
            let swapped = self
                .store
                .compare_and_swap(&key, current.as_deref(), &updated, self.ttl)
                .await
                .map_err(StorageError::backend)?;
            if swapped {
                return Ok(());
            }
            trace!("🪪️ Concurrent update of {key}. Retrying");
        }
        Err(StorageError::Contention(key))
    }
}

fn parse_alias_list(key: &str, value: Option<&str>) -> Result<Vec<Alias>, StorageError> {
    match value {
        None => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json)
            .map_err(|e| StorageError::Corrupt { key: key.to_string(), reason: e.to_string() }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stores::MemoryStore;

    fn index() -> IdentityIndex<MemoryStore> {
        IdentityIndex::new(MemoryStore::new(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn register_and_resolve() {
        let index = index();
        let order = OrderId::from("ORD-1".to_string());
        index.register(&Alias::from("hash"), &order).await.unwrap();
        index.register(&Alias::from("req"), &order).await.unwrap();
        assert_eq!(index.resolve(&Alias::from("hash")).await.unwrap(), Some(order.clone()));
        assert_eq!(index.resolve(&Alias::from("req")).await.unwrap(), Some(order.clone()));
        assert_eq!(index.resolve(&Alias::from("other")).await.unwrap(), None);
        assert_eq!(index.aliases_for(&order).await.unwrap(), vec![Alias::from("hash"), Alias::from("req")]);
    }

    #[tokio::test]
    async fn registration_is_idempotent() {
        let index = index();
        let order = OrderId::from("ORD-1".to_string());
        let alias = Alias::from("hash");
        index.register(&alias, &order).await.unwrap();
        index.register(&alias, &order).await.unwrap();
        assert_eq!(index.aliases_for(&order).await.unwrap(), vec![alias]);
    }

    #[tokio::test]
    async fn conflicting_registration_is_refused() {
        let index = index();
        let first = OrderId::from("ORD-1".to_string());
        let second = OrderId::from("ORD-2".to_string());
        let alias = Alias::from("hash");
        index.register(&alias, &first).await.unwrap();
        let err = index.register(&alias, &second).await.unwrap_err();
        assert_eq!(
            err,
            IdentityIndexError::AliasConflict(AliasConflictError {
                alias: alias.clone(),
                existing: first.clone(),
                requested: second.clone(),
            })
        );
        assert_eq!(index.resolve(&alias).await.unwrap(), Some(first));
        assert!(index.aliases_for(&second).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_registrations_keep_every_alias() {
        let index = index();
        let order = OrderId::from("ORD-1".to_string());
        let tasks = (0..16)
            .map(|i| {
                let index = index.clone();
                let order = order.clone();
                tokio::spawn(async move { index.register(&Alias::from(format!("alias-{i}")), &order).await })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(index.aliases_for(&order).await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn siblings_of_unknown_alias_is_just_itself() {
        let index = index();
        let alias = Alias::from("lonely");
        assert_eq!(index.siblings_of(&alias).await.unwrap(), vec![alias]);
    }
}
