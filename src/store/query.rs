use crate::domain::{Entity, Variant};
use crate::store::{EntityStore, StoreError};

/// Read-only view handed to the outward query layer
pub trait QueryFacade: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Entity, StoreError>;

    fn list_by_variant(&self, variant: Variant) -> Vec<Entity>;
}

impl QueryFacade for EntityStore {
    fn get_by_id(&self, id: &str) -> Result<Entity, StoreError> {
        EntityStore::get_by_id(self, id)
    }

    fn list_by_variant(&self, variant: Variant) -> Vec<Entity> {
        EntityStore::list_by_variant(self, variant)
    }
}
