use crate::domain::{round_to_tenth, Beach, Entity, ExerciseTrail, Variant};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Authoritative in-memory collection of entities.
///
/// Entities are created once at construction and never added or removed.
/// Each variant lives in its own sharded map: a conditional update holds the
/// write guard of a single entry for the check and the write, so updates to
/// different entities proceed independently and readers only ever clone
/// whole entities.
pub struct EntityStore {
    beaches: DashMap<String, Beach>,
    trails: DashMap<String, ExerciseTrail>,

    /// Sensor id -> beach id, first beach in feed order wins
    sensors: HashMap<String, String>,
}

impl EntityStore {
    /// Build the store from ingested entities.
    pub fn new(entities: Vec<Entity>) -> Self {
        let beaches = DashMap::new();
        let trails = DashMap::new();
        let mut sensors = HashMap::new();

        for entity in entities {
            match entity {
                Entity::Beach(beach) => {
                    if beaches.contains_key(&beach.id) {
                        warn!(entity_id = %beach.id, "Duplicate beach identifier, keeping first");
                        continue;
                    }

                    if let Some(sensor) = &beach.sensor_id {
                        if let Some(existing) = sensors.get(sensor) {
                            warn!(
                                sensor_id = %sensor,
                                entity_id = %beach.id,
                                updates_go_to = %existing,
                                "Sensor shared by several beaches"
                            );
                        } else {
                            sensors.insert(sensor.clone(), beach.id.clone());
                        }
                    }

                    beaches.insert(beach.id.clone(), beach);
                }
                Entity::ExerciseTrail(trail) => {
                    if trails.contains_key(&trail.id) {
                        warn!(entity_id = %trail.id, "Duplicate trail identifier, keeping first");
                        continue;
                    }
                    trails.insert(trail.id.clone(), trail);
                }
            }
        }

        info!(
            beaches = beaches.len(),
            trails = trails.len(),
            sensors = sensors.len(),
            "Entity store loaded"
        );

        Self {
            beaches,
            trails,
            sensors,
        }
    }

    /// Get entity by ID
    pub fn get_by_id(&self, id: &str) -> Result<Entity, StoreError> {
        if let Some(beach) = self.beaches.get(id) {
            return Ok(Entity::Beach(beach.clone()));
        }
        if let Some(trail) = self.trails.get(id) {
            return Ok(Entity::ExerciseTrail(trail.clone()));
        }
        Err(StoreError::NotFound(id.to_string()))
    }

    /// Snapshot of all entities of one variant (unordered)
    pub fn list_by_variant(&self, variant: Variant) -> Vec<Entity> {
        match variant {
            Variant::Beach => self
                .beaches
                .iter()
                .map(|b| Entity::Beach(b.value().clone()))
                .collect(),
            Variant::ExerciseTrail => self
                .trails
                .iter()
                .map(|t| Entity::ExerciseTrail(t.value().clone()))
                .collect(),
        }
    }

    /// Record a water temperature reading for the beach carrying `sensor_id`.
    ///
    /// Rejected with `StaleUpdate` unless `observed_at` is strictly after the
    /// beach's last modification. On success the temperature is rounded to
    /// one decimal, last-modified moves to the current time and the beach id
    /// is returned.
    pub fn update_beach_temperature(
        &self,
        sensor_id: &str,
        temperature: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let entity_id = self
            .sensors
            .get(sensor_id)
            .ok_or_else(|| StoreError::NotFound(format!("sensor {}", sensor_id)))?;

        // Write guard held across the check and the write
        let mut beach = self
            .beaches
            .get_mut(entity_id)
            .ok_or_else(|| StoreError::NotFound(entity_id.clone()))?;

        if let Some(last_modified) = beach.date_modified {
            if observed_at <= last_modified {
                return Err(StoreError::StaleUpdate {
                    entity_id: entity_id.clone(),
                    observed_at,
                    last_modified,
                });
            }
        }

        let temperature = round_to_tenth(temperature);
        beach.water_temperature = Some(temperature);
        beach.date_modified = Some(Utc::now());

        debug!(entity_id = %entity_id, temperature, "Water temperature updated");

        Ok(entity_id.clone())
    }

    /// Set the last grooming time of a trail. Grooming times are taken as
    /// authoritative, so there is no ordering check.
    pub fn update_trail_last_groomed(
        &self,
        trail_id: &str,
        groomed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut trail = self
            .trails
            .get_mut(trail_id)
            .ok_or_else(|| StoreError::NotFound(trail_id.to_string()))?;

        trail.date_last_preparation = Some(groomed_at);

        debug!(entity_id = %trail_id, groomed_at = %groomed_at.to_rfc3339(), "Trail preparation updated");

        Ok(())
    }

    pub fn beach_count(&self) -> usize {
        self.beaches.len()
    }

    pub fn trail_count(&self) -> usize {
        self.trails.len()
    }
}
