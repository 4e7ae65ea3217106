//! Viewer state machine.
//!
//! The only persistent state is `Viewing(index)`. Selection is an orthogonal
//! overlay: navigating never touches it, and selecting never moves the view.
//!
//! ```text
//! Viewing(i) --next--> Viewing(i + 1)     (ignored at the last entity)
//! Viewing(i) --prev--> Viewing(i - 1)     (ignored at index 0)
//! Viewing(i) --jump_to(j)--> Viewing(j)   (ignored if j == i or j >= N)
//! select:   selected = Some(viewed)
//! deselect: selected = None
//! ```

use std::sync::Arc;

use crate::{
    error::Result,
    events::{EventStream, SubscriptionId},
    registry::{Entity, Registry},
};

// ============================================================================
// Events
// ============================================================================

/// The viewed entity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewChanged {
    pub prev: usize,
    pub current: usize,
}

/// The viewed entity was committed to for customizing.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub index: usize,
    pub entity: Arc<Entity>,
}

/// The selection was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deselected {
    /// Index that was selected before clearing.
    pub index: usize,
}

// ============================================================================
// State machine
// ============================================================================

/// Tracks the viewed and selected entity over a registry.
#[derive(Debug)]
pub struct Viewer {
    registry: Registry,
    viewed: usize,
    selected: Option<usize>,
    view_changed: EventStream<ViewChanged>,
    selected_events: EventStream<Selected>,
    deselected: EventStream<Deselected>,
}

impl Viewer {
    /// Start viewing the first entity, with nothing selected.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            viewed: 0,
            selected: None,
            view_changed: EventStream::new(),
            selected_events: EventStream::new(),
            deselected: EventStream::new(),
        }
    }

    /// Start viewing the entity at `start`.
    pub fn starting_at(registry: Registry, start: usize) -> Result<Self> {
        registry.try_get(start)?;
        let mut viewer = Self::new(registry);
        viewer.viewed = start;
        Ok(viewer)
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn viewed_index(&self) -> usize {
        self.viewed
    }

    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// The entity currently on screen.
    #[must_use]
    pub fn viewed(&self) -> &Arc<Entity> {
        // The registry is never empty and `viewed` never leaves its bounds.
        &self.registry[self.viewed]
    }

    /// The entity being customized, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Arc<Entity>> {
        self.selected.and_then(|index| self.registry.get(index))
    }

    /// Whether `prev` would move.
    #[must_use]
    pub fn can_prev(&self) -> bool {
        self.viewed > 0
    }

    /// Whether `next` would move.
    #[must_use]
    pub fn can_next(&self) -> bool {
        self.viewed + 1 < self.registry.len()
    }

    /// View the next entity. Ignored at the last one.
    pub fn next(&mut self) -> Option<ViewChanged> {
        if !self.can_next() {
            return None;
        }
        Some(self.move_to(self.viewed + 1))
    }

    /// View the previous entity. Ignored at the first one.
    pub fn prev(&mut self) -> Option<ViewChanged> {
        if !self.can_prev() {
            return None;
        }
        Some(self.move_to(self.viewed - 1))
    }

    /// View the entity at `index`.
    ///
    /// Out-of-range indices and the current index are ignored.
    pub fn jump_to(&mut self, index: usize) -> Option<ViewChanged> {
        if let Err(e) = self.registry.try_get(index) {
            tracing::debug!("Ignoring jump: {e}");
            return None;
        }
        if index == self.viewed {
            return None;
        }
        Some(self.move_to(index))
    }

    fn move_to(&mut self, index: usize) -> ViewChanged {
        let event = ViewChanged {
            prev: self.viewed,
            current: index,
        };
        self.viewed = index;
        tracing::debug!("View changed {} -> {}", event.prev, event.current);
        self.view_changed.emit(&event);
        event
    }

    /// Select the viewed entity.
    ///
    /// Selecting again re-emits, even for the same entity.
    pub fn select(&mut self) -> Selected {
        let index = self.viewed;
        self.selected = Some(index);
        let event = Selected {
            index,
            entity: Arc::clone(self.viewed()),
        };
        tracing::debug!("Selected {}", event.entity.id);
        self.selected_events.emit(&event);
        event
    }

    /// Clear the selection. Ignored when nothing is selected.
    pub fn deselect(&mut self) -> Option<Deselected> {
        let index = self.selected.take()?;
        let event = Deselected { index };
        tracing::debug!("Deselected index {index}");
        self.deselected.emit(&event);
        Some(event)
    }

    pub fn on_view_changed(
        &mut self,
        handler: impl FnMut(&ViewChanged) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.view_changed.subscribe(handler)
    }

    pub fn on_selected(
        &mut self,
        handler: impl FnMut(&Selected) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.selected_events.subscribe(handler)
    }

    pub fn on_deselected(
        &mut self,
        handler: impl FnMut(&Deselected) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.deselected.subscribe(handler)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::Error;

    fn registry(n: usize) -> Registry {
        Registry::new(
            (0..n)
                .map(|i| Entity::new(format!("car-{i}"), format!("Car {i}"), "models/car.glb"))
                .collect(),
        )
        .unwrap()
    }

    /// Viewer whose events are recorded as strings.
    fn recording_viewer(n: usize) -> (Viewer, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut viewer = Viewer::new(registry(n));
        {
            let log = Arc::clone(&log);
            viewer.on_view_changed(move |e| {
                log.lock()
                    .unwrap()
                    .push(format!("view {}->{}", e.prev, e.current));
            });
        }
        {
            let log = Arc::clone(&log);
            viewer.on_selected(move |e| {
                log.lock()
                    .unwrap()
                    .push(format!("selected {}", e.entity.id));
            });
        }
        {
            let log = Arc::clone(&log);
            viewer.on_deselected(move |e| {
                log.lock().unwrap().push(format!("deselected {}", e.index));
            });
        }
        (viewer, log)
    }

    #[test]
    fn test_next_until_bound() {
        let (mut viewer, log) = recording_viewer(3);

        assert_eq!(viewer.next(), Some(ViewChanged { prev: 0, current: 1 }));
        assert_eq!(viewer.next(), Some(ViewChanged { prev: 1, current: 2 }));
        assert_eq!(viewer.next(), None);

        assert_eq!(viewer.viewed_index(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["view 0->1", "view 1->2"]);
    }

    #[test]
    fn test_prev_at_zero_is_noop() {
        let (mut viewer, log) = recording_viewer(3);
        assert_eq!(viewer.prev(), None);
        assert_eq!(viewer.viewed_index(), 0);
        assert_eq!(viewer.selected_index(), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        // Deterministic pseudo-random walk over several registry sizes.
        for n in 1..6 {
            let mut viewer = Viewer::new(registry(n));
            let mut state = 0x2545_f491_u32;
            for _ in 0..200 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                if state % 2 == 0 {
                    viewer.next();
                } else {
                    viewer.prev();
                }
                assert!(viewer.viewed_index() < n);
            }
        }
    }

    #[test]
    fn test_single_entity_cannot_move() {
        let (mut viewer, log) = recording_viewer(1);
        assert!(!viewer.can_next());
        assert!(!viewer.can_prev());
        assert_eq!(viewer.next(), None);
        assert_eq!(viewer.prev(), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_jump_to_current_is_silent() {
        let (mut viewer, log) = recording_viewer(3);
        viewer.next();
        log.lock().unwrap().clear();

        assert_eq!(viewer.jump_to(viewer.viewed_index()), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_jump_to_out_of_range_is_silent() {
        let (mut viewer, log) = recording_viewer(3);
        assert_eq!(viewer.jump_to(3), None);
        assert_eq!(viewer.jump_to(usize::MAX), None);
        assert_eq!(viewer.viewed_index(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_jump_to_valid_index() {
        let (mut viewer, log) = recording_viewer(3);
        assert_eq!(viewer.jump_to(2), Some(ViewChanged { prev: 0, current: 2 }));
        assert_eq!(viewer.jump_to(0), Some(ViewChanged { prev: 2, current: 0 }));
        assert_eq!(*log.lock().unwrap(), vec!["view 0->2", "view 2->0"]);
    }

    #[test]
    fn test_select_then_deselect() {
        let (mut viewer, log) = recording_viewer(3);

        let selected = viewer.select();
        assert_eq!(selected.index, 0);
        assert_eq!(viewer.selected_index(), Some(0));
        assert_eq!(viewer.selected().unwrap().id.as_str(), "car-0");

        assert_eq!(viewer.deselect(), Some(Deselected { index: 0 }));
        assert_eq!(viewer.selected_index(), None);
        assert_eq!(viewer.viewed_index(), 0);

        assert_eq!(*log.lock().unwrap(), vec!["selected car-0", "deselected 0"]);
    }

    #[test]
    fn test_deselect_without_selection_is_silent() {
        let (mut viewer, log) = recording_viewer(2);
        assert_eq!(viewer.deselect(), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_navigation_keeps_selection() {
        let (mut viewer, _log) = recording_viewer(3);
        viewer.next();
        viewer.select();
        viewer.next();
        viewer.prev();
        viewer.prev();

        assert_eq!(viewer.viewed_index(), 0);
        assert_eq!(viewer.selected_index(), Some(1));
    }

    #[test]
    fn test_selection_keeps_view() {
        let (mut viewer, _log) = recording_viewer(3);
        viewer.jump_to(2);
        viewer.select();
        viewer.deselect();
        assert_eq!(viewer.viewed_index(), 2);
    }

    #[test]
    fn test_starting_at() {
        let viewer = Viewer::starting_at(registry(3), 2).unwrap();
        assert_eq!(viewer.viewed_index(), 2);
        assert!(viewer.can_prev());
        assert!(!viewer.can_next());

        assert!(matches!(
            Viewer::starting_at(registry(3), 3),
            Err(Error::OutOfRangeIndex { index: 3, len: 3 })
        ));
    }
}
