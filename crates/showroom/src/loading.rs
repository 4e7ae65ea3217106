//! Asset-load tracking with cancel-and-replace.
//!
//! Each entity has at most one load in flight. Starting a new load for an
//! entity supersedes the previous one; when the superseded load completes,
//! its result is reported as [`LoadOutcome::Stale`] and must not be applied
//! to the scene.

use std::collections::HashMap;

use crate::{
    error::Error,
    events::{EventStream, SubscriptionId},
    registry::EntityId,
};

/// Proof that a load was started. Hand it back to [`LoadTracker::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    entity: EntityId,
    generation: u64,
}

impl LoadTicket {
    #[must_use]
    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What the caller should do with a finished load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load is current; apply it.
    Applied,
    /// A newer load replaced this one; discard the result.
    Stale,
    /// The load failed and was reported. It can be retried.
    Failed,
}

/// A load failure, broadcast to subscribers.
#[derive(Debug)]
pub struct LoadFailed {
    pub entity: EntityId,
    pub error: Error,
}

#[derive(Debug)]
enum LoadState {
    InFlight { generation: u64 },
    Loaded,
    Failed(LoadFailed),
}

/// Tracks the single in-flight load per entity.
#[derive(Debug, Default)]
pub struct LoadTracker {
    states: HashMap<EntityId, LoadState>,
    next_generation: u64,
    load_failed: EventStream<LoadFailed>,
}

impl LoadTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading an entity, superseding any load already in flight.
    pub fn begin(&mut self, entity: &EntityId) -> LoadTicket {
        self.next_generation += 1;
        let generation = self.next_generation;

        if let Some(LoadState::InFlight { generation: old }) = self.states.get(entity) {
            tracing::debug!("Load {old} of {entity} superseded by load {generation}");
        }
        self.states
            .insert(entity.clone(), LoadState::InFlight { generation });

        LoadTicket {
            entity: entity.clone(),
            generation,
        }
    }

    /// Report a completed load.
    pub fn finish(&mut self, ticket: &LoadTicket, result: Result<(), Error>) -> LoadOutcome {
        let current = matches!(
            self.states.get(&ticket.entity),
            Some(LoadState::InFlight { generation }) if *generation == ticket.generation
        );
        if !current {
            tracing::debug!(
                "Discarding stale load {} of {}",
                ticket.generation,
                ticket.entity
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(()) => {
                self.states.insert(ticket.entity.clone(), LoadState::Loaded);
                LoadOutcome::Applied
            }
            Err(error) => {
                tracing::warn!("Load of {} failed: {error}", ticket.entity);
                let failure = LoadFailed {
                    entity: ticket.entity.clone(),
                    error,
                };
                self.load_failed.emit(&failure);
                self.states
                    .insert(ticket.entity.clone(), LoadState::Failed(failure));
                LoadOutcome::Failed
            }
        }
    }

    /// Forget an entity's load, e.g. when its scene is torn down.
    ///
    /// Any ticket still out for it becomes stale.
    pub fn forget(&mut self, entity: &EntityId) {
        self.states.remove(entity);
    }

    /// Returns true if a load for `entity` is in flight.
    #[must_use]
    pub fn is_loading(&self, entity: &EntityId) -> bool {
        matches!(self.states.get(entity), Some(LoadState::InFlight { .. }))
    }

    /// Returns true if the latest load for `entity` succeeded.
    #[must_use]
    pub fn is_loaded(&self, entity: &EntityId) -> bool {
        matches!(self.states.get(entity), Some(LoadState::Loaded))
    }

    /// The error from the latest load of `entity`, if it failed.
    #[must_use]
    pub fn failure(&self, entity: &EntityId) -> Option<&Error> {
        match self.states.get(entity) {
            Some(LoadState::Failed(failure)) => Some(&failure.error),
            _ => None,
        }
    }

    /// Number of loads in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.states
            .values()
            .filter(|state| matches!(state, LoadState::InFlight { .. }))
            .count()
    }

    pub fn on_load_failed(
        &mut self,
        handler: impl FnMut(&LoadFailed) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.load_failed.subscribe(handler)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn load_error(asset: &str) -> Error {
        Error::AssetLoadFailure {
            asset: asset.to_string(),
            message: "file not found".to_string(),
        }
    }

    #[test]
    fn test_load_applies() {
        let mut tracker = LoadTracker::new();
        let car = EntityId::new("car");

        let ticket = tracker.begin(&car);
        assert!(tracker.is_loading(&car));
        assert_eq!(tracker.in_flight(), 1);

        assert_eq!(tracker.finish(&ticket, Ok(())), LoadOutcome::Applied);
        assert!(tracker.is_loaded(&car));
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_superseded_load_is_stale() {
        let mut tracker = LoadTracker::new();
        let car = EntityId::new("car");

        let first = tracker.begin(&car);
        let second = tracker.begin(&car);
        assert_eq!(tracker.in_flight(), 1);
        assert_ne!(first.generation(), second.generation());

        // The older load finishing last must not win.
        assert_eq!(tracker.finish(&second, Ok(())), LoadOutcome::Applied);
        assert_eq!(tracker.finish(&first, Ok(())), LoadOutcome::Stale);
        assert!(tracker.is_loaded(&car));
    }

    #[test]
    fn test_stale_failure_is_not_reported() {
        let failures = Arc::new(Mutex::new(0));
        let mut tracker = LoadTracker::new();
        {
            let failures = Arc::clone(&failures);
            tracker.on_load_failed(move |_| *failures.lock().unwrap() += 1);
        }
        let car = EntityId::new("car");

        let first = tracker.begin(&car);
        let _second = tracker.begin(&car);

        assert_eq!(
            tracker.finish(&first, Err(load_error("models/car.glb"))),
            LoadOutcome::Stale
        );
        assert_eq!(*failures.lock().unwrap(), 0);
        assert!(tracker.is_loading(&car));
    }

    #[test]
    fn test_failure_is_reported_and_retryable() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = LoadTracker::new();
        {
            let log = Arc::clone(&log);
            tracker.on_load_failed(move |failure| {
                log.lock()
                    .unwrap()
                    .push(format!("{}: {}", failure.entity, failure.error));
            });
        }
        let car = EntityId::new("car");

        let ticket = tracker.begin(&car);
        assert_eq!(
            tracker.finish(&ticket, Err(load_error("models/car.glb"))),
            LoadOutcome::Failed
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec!["car: failed to load asset models/car.glb: file not found"]
        );
        assert!(matches!(
            tracker.failure(&car),
            Some(Error::AssetLoadFailure { .. })
        ));

        let retry = tracker.begin(&car);
        assert!(tracker.failure(&car).is_none());
        assert_eq!(tracker.finish(&retry, Ok(())), LoadOutcome::Applied);
    }

    #[test]
    fn test_forget_makes_ticket_stale() {
        let mut tracker = LoadTracker::new();
        let car = EntityId::new("car");
        let ticket = tracker.begin(&car);

        tracker.forget(&car);

        assert!(!tracker.is_loading(&car));
        assert_eq!(tracker.finish(&ticket, Ok(())), LoadOutcome::Stale);
    }

    #[test]
    fn test_loads_are_per_entity() {
        let mut tracker = LoadTracker::new();
        let a = tracker.begin(&EntityId::new("a"));
        let b = tracker.begin(&EntityId::new("b"));
        assert_eq!(tracker.in_flight(), 2);
        assert_eq!(tracker.finish(&a, Ok(())), LoadOutcome::Applied);
        assert_eq!(tracker.finish(&b, Ok(())), LoadOutcome::Applied);
    }
}
