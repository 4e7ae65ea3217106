//! The showroom session.
//!
//! [`Showroom`] owns the viewer, the paint broker and the load tracker, and
//! queues the [`StageCommand`]s each change implies. A front end calls the
//! operations below in response to input, then drains the queue once per frame
//! and executes it.

use std::{collections::HashMap, sync::Arc};

use crate::{
    catalog::Catalog,
    error::{Error, Result},
    events::SubscriptionId,
    loading::{LoadFailed, LoadOutcome, LoadTicket, LoadTracker},
    paint::{ColorChoice, PaintBroker, Rgb, TextureData},
    registry::{Entity, EntityId, Registry},
    stage::{Layout, StageCommand, StageDirector},
    viewer::{Deselected, Selected, ViewChanged, Viewer},
};

/// A running showroom.
#[derive(Debug)]
pub struct Showroom {
    viewer: Viewer,
    paint: PaintBroker,
    loads: LoadTracker,
    director: StageDirector,
    /// Last paint applied to each entity, restored when it is reloaded.
    painted: HashMap<EntityId, ColorChoice>,
    commands: Vec<StageCommand>,
    opened: bool,
}

impl Showroom {
    /// Start a showroom on the catalog's first entity.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        let director = StageDirector::new(catalog.layout, &catalog.registry);
        Self::assemble(Viewer::new(catalog.registry), catalog.palette, director)
    }

    /// Start a showroom on the entity at `start`.
    pub fn with_start(catalog: Catalog, start: usize) -> Result<Self> {
        let director = StageDirector::new(catalog.layout, &catalog.registry);
        let viewer = Viewer::starting_at(catalog.registry, start)?;
        Ok(Self::assemble(viewer, catalog.palette, director))
    }

    fn assemble(viewer: Viewer, palette: Vec<Rgb>, director: StageDirector) -> Self {
        Self {
            viewer,
            paint: PaintBroker::new(palette),
            loads: LoadTracker::new(),
            director,
            painted: HashMap::new(),
            commands: Vec::new(),
            opened: false,
        }
    }

    /// Queue the commands that set up the stage. Only the first call does
    /// anything.
    pub fn open(&mut self) {
        if self.opened {
            return;
        }
        self.opened = true;
        tracing::info!(
            "Opening showroom with {} entities ({:?} layout)",
            self.viewer.registry().len(),
            self.director.layout()
        );
        let commands = self.director.opening(&self.viewer, &mut self.loads);
        self.commands.extend(commands);
    }

    // ========================================================================
    // Navigation and selection
    // ========================================================================

    pub fn next(&mut self) -> Option<ViewChanged> {
        let event = self.viewer.next()?;
        self.view_changed(&event);
        Some(event)
    }

    pub fn prev(&mut self) -> Option<ViewChanged> {
        let event = self.viewer.prev()?;
        self.view_changed(&event);
        Some(event)
    }

    pub fn jump_to(&mut self, index: usize) -> Option<ViewChanged> {
        let event = self.viewer.jump_to(index)?;
        self.view_changed(&event);
        Some(event)
    }

    fn view_changed(&mut self, event: &ViewChanged) {
        let commands = self
            .director
            .view_changed(event, &self.viewer, &mut self.loads);
        self.commands.extend(commands);
    }

    pub fn select(&mut self) -> Selected {
        let event = self.viewer.select();
        self.commands.extend(self.director.selected(&event));
        event
    }

    pub fn deselect(&mut self) -> Option<Deselected> {
        let event = self.viewer.deselect()?;
        self.commands.extend(self.director.deselected(&self.viewer));
        Some(event)
    }

    // ========================================================================
    // Paint
    // ========================================================================

    /// Paint the selected entity from a color string.
    ///
    /// Empty or unparseable input is ignored. With nothing selected the
    /// choice is still broadcast but nothing is repainted.
    pub fn set_color(&mut self, input: &str) -> Option<ColorChoice> {
        let choice = self.paint.set_color(input)?;
        self.paint_selected(&choice);
        Some(choice)
    }

    pub fn set_rgb(&mut self, rgb: Rgb) -> Option<ColorChoice> {
        let choice = self.paint.set_rgb(rgb)?;
        self.paint_selected(&choice);
        Some(choice)
    }

    /// Paint the selected entity with an encoded image. Empty input is
    /// ignored.
    pub fn set_texture(&mut self, bytes: impl Into<Arc<[u8]>>) -> Option<ColorChoice> {
        let choice = self.paint.set_texture(bytes)?;
        self.paint_selected(&choice);
        Some(choice)
    }

    fn paint_selected(&mut self, choice: &ColorChoice) {
        let Some(entity) = self.viewer.selected() else {
            tracing::debug!("Paint changed with nothing selected");
            return;
        };
        let commands = self.director.paint(choice, entity);
        if !commands.is_empty() {
            self.painted.insert(entity.id.clone(), choice.clone());
        }
        self.commands.extend(commands);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Report a finished asset load.
    ///
    /// A current, successful load gets the entity's last paint reapplied.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: std::result::Result<(), Error>,
    ) -> LoadOutcome {
        let outcome = self.loads.finish(ticket, result);
        if outcome == LoadOutcome::Applied
            && let Some(choice) = self.painted.get(ticket.entity())
            && let Some(entity) = self.viewer.registry().find(ticket.entity())
        {
            self.commands.extend(self.director.paint(choice, entity));
        }
        outcome
    }

    /// Load an entity again after a failure.
    ///
    /// Returns false if its last load did not fail, or if it is no longer on
    /// stage.
    pub fn retry_load(&mut self, id: &EntityId) -> bool {
        if self.loads.failure(id).is_none() {
            return false;
        }
        let registry = self.viewer.registry();
        let Some(index) = registry.position(id) else {
            return false;
        };
        if self.director.layout() == Layout::Scenes && index != self.viewer.viewed_index() {
            return false;
        }

        tracing::info!("Retrying load of {id}");
        let entity = Arc::clone(&registry[index]);
        let commands = self.director.load(index, &entity, &mut self.loads);
        self.commands.extend(commands);
        true
    }

    /// Take every command queued since the last drain, oldest first.
    pub fn drain_commands(&mut self) -> Vec<StageCommand> {
        std::mem::take(&mut self.commands)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        self.viewer.registry()
    }

    #[must_use]
    pub fn paint(&self) -> &PaintBroker {
        &self.paint
    }

    #[must_use]
    pub fn loads(&self) -> &LoadTracker {
        &self.loads
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.director.layout()
    }

    /// The entity currently on screen.
    #[must_use]
    pub fn viewed(&self) -> &Arc<Entity> {
        self.viewer.viewed()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn on_view_changed(
        &mut self,
        handler: impl FnMut(&ViewChanged) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.viewer.on_view_changed(handler)
    }

    pub fn on_selected(
        &mut self,
        handler: impl FnMut(&Selected) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.viewer.on_selected(handler)
    }

    pub fn on_deselected(
        &mut self,
        handler: impl FnMut(&Deselected) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.viewer.on_deselected(handler)
    }

    pub fn on_color_changed(
        &mut self,
        handler: impl FnMut(&Rgb) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.paint.on_color_changed(handler)
    }

    pub fn on_texture_changed(
        &mut self,
        handler: impl FnMut(&TextureData) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.paint.on_texture_changed(handler)
    }

    pub fn on_load_failed(
        &mut self,
        handler: impl FnMut(&LoadFailed) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.loads.on_load_failed(handler)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{registry::PartId, stage::Framing};

    fn showroom(layout: Layout) -> Showroom {
        let mut showroom = Showroom::new(Catalog::builtin(layout).unwrap());
        showroom.open();
        showroom
    }

    fn tickets(commands: &[StageCommand]) -> Vec<LoadTicket> {
        commands
            .iter()
            .filter_map(|command| match command {
                StageCommand::LoadAsset { ticket, .. } => Some(ticket.clone()),
                _ => None,
            })
            .collect()
    }

    fn colors(commands: &[StageCommand]) -> Vec<(String, Rgb)> {
        commands
            .iter()
            .filter_map(|command| match command {
                StageCommand::SetPartColor { part, color, .. } => {
                    Some((part.as_str().to_string(), *color))
                }
                _ => None,
            })
            .collect()
    }

    fn load_error() -> Error {
        Error::AssetLoadFailure {
            asset: "models/missing.glb".to_string(),
            message: "not found".to_string(),
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut showroom = showroom(Layout::Carousel);
        assert_eq!(tickets(&showroom.drain_commands()).len(), 3);

        showroom.open();
        assert!(showroom.drain_commands().is_empty());
    }

    #[test]
    fn test_with_start() {
        let catalog = Catalog::builtin(Layout::Carousel).unwrap();
        let showroom = Showroom::with_start(catalog, 2).unwrap();
        assert_eq!(showroom.viewed().display_name, "BMW M4 CSL 2023");

        let catalog = Catalog::builtin(Layout::Carousel).unwrap();
        assert!(matches!(
            Showroom::with_start(catalog, 7),
            Err(Error::OutOfRangeIndex { index: 7, len: 3 })
        ));
    }

    #[test]
    fn test_navigation_at_bounds_queues_nothing() {
        let mut showroom = showroom(Layout::Carousel);
        showroom.drain_commands();

        assert_eq!(showroom.prev(), None);
        assert_eq!(showroom.jump_to(0), None);
        assert_eq!(showroom.jump_to(3), None);
        assert!(showroom.drain_commands().is_empty());

        showroom.jump_to(2);
        showroom.drain_commands();
        assert_eq!(showroom.next(), None);
        assert!(showroom.drain_commands().is_empty());
    }

    #[test]
    fn test_select_first_entity() {
        let mut showroom = showroom(Layout::Carousel);
        showroom.drain_commands();

        let selected = showroom.select();
        assert_eq!(selected.index, 0);
        assert_eq!(showroom.viewer().selected_index(), Some(0));

        let commands = showroom.drain_commands();
        assert!(matches!(
            commands[0],
            StageCommand::MoveCamera {
                framing: Framing::Focus,
                ..
            }
        ));
        assert_eq!(commands[1], StageCommand::ShowPaintPanel { visible: true });
    }

    #[test]
    fn test_color_applies_to_selected_parts() {
        let mut showroom = showroom(Layout::Carousel);
        showroom.jump_to(2);
        showroom.select();
        showroom.drain_commands();

        showroom.set_color("rgb(200, 0, 0)");
        let painted = colors(&showroom.drain_commands());
        assert_eq!(
            painted,
            vec![
                ("M4xNME_body_M4xNME_Paint_0".to_string(), Rgb::new(200, 0, 0)),
                ("M4xNME_fender_L_M4xNME_Paint_0".to_string(), Rgb::new(200, 0, 0)),
            ]
        );
    }

    #[test]
    fn test_color_without_selection_is_broadcast_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut showroom = showroom(Layout::Carousel);
        {
            let seen = Arc::clone(&seen);
            showroom.on_color_changed(move |rgb| seen.lock().unwrap().push(*rgb));
        }
        showroom.drain_commands();

        assert!(showroom.set_rgb(Rgb::new(0, 200, 0)).is_some());
        assert!(showroom.drain_commands().is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![Rgb::new(0, 200, 0)]);
    }

    #[test]
    fn test_empty_input_is_ignored() {
        let mut showroom = showroom(Layout::Carousel);
        showroom.select();
        showroom.drain_commands();

        assert_eq!(showroom.set_color(""), None);
        assert_eq!(showroom.set_texture(Vec::<u8>::new()), None);
        assert!(showroom.drain_commands().is_empty());
    }

    #[test]
    fn test_texture_applies_to_selected_parts() {
        let mut showroom = showroom(Layout::Carousel);
        showroom.select();
        showroom.drain_commands();

        showroom.set_texture(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
        let commands = showroom.drain_commands();
        assert_eq!(commands.len(), 1);
        let StageCommand::SetPartTexture { part, .. } = &commands[0] else {
            panic!("expected a texture command, got {commands:?}");
        };
        assert_eq!(*part, PartId::new("CarBody_1_Car_Paint_0_1"));
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut showroom = showroom(Layout::Scenes);
        let first = tickets(&showroom.drain_commands());

        // Leave and come back before the first load finishes.
        showroom.next();
        showroom.prev();
        let latest = tickets(&showroom.drain_commands());
        let horror = EntityId::new("horror-scene");
        let latest = latest.iter().find(|t| *t.entity() == horror).unwrap();

        assert_eq!(
            showroom.finish_load(&first[0], Ok(())),
            LoadOutcome::Stale
        );
        assert_eq!(showroom.finish_load(latest, Ok(())), LoadOutcome::Applied);
    }

    #[test]
    fn test_failed_load_is_reported_and_retried() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let mut showroom = showroom(Layout::Carousel);
        {
            let failures = Arc::clone(&failures);
            showroom.on_load_failed(move |failure| {
                failures.lock().unwrap().push(failure.entity.clone());
            });
        }
        let opening = tickets(&showroom.drain_commands());
        let lotus = opening[1].entity().clone();

        assert!(!showroom.retry_load(&lotus));
        assert_eq!(
            showroom.finish_load(&opening[1], Err(load_error())),
            LoadOutcome::Failed
        );
        assert_eq!(*failures.lock().unwrap(), vec![lotus.clone()]);

        // The other cars are unaffected.
        assert_eq!(
            showroom.finish_load(&opening[0], Ok(())),
            LoadOutcome::Applied
        );

        assert!(showroom.retry_load(&lotus));
        let retried = tickets(&showroom.drain_commands());
        assert_eq!(retried.len(), 1);
        assert_eq!(
            showroom.finish_load(&retried[0], Ok(())),
            LoadOutcome::Applied
        );
        assert!(showroom.loads().is_loaded(&lotus));
    }

    #[test]
    fn test_retry_skips_scene_off_stage() {
        let mut showroom = showroom(Layout::Scenes);
        let opening = tickets(&showroom.drain_commands());
        showroom.finish_load(&opening[0], Err(load_error()));

        showroom.next();
        showroom.drain_commands();
        assert!(!showroom.retry_load(opening[0].entity()));
    }

    #[test]
    fn test_reload_restores_paint() {
        let mut showroom = showroom(Layout::Scenes);
        showroom.drain_commands();
        showroom.select();
        showroom.set_rgb(Rgb::new(200, 200, 0));

        showroom.next();
        showroom.prev();
        let reload = tickets(&showroom.drain_commands());
        let horror = reload
            .iter()
            .find(|t| t.entity().as_str() == "horror-scene")
            .unwrap();

        showroom.finish_load(horror, Ok(()));
        let painted = colors(&showroom.drain_commands());
        assert_eq!(
            painted,
            vec![("CarBody_1_Car_Paint_0_1".to_string(), Rgb::new(200, 200, 0))]
        );
    }

    #[test]
    fn test_subscriptions_forward() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut showroom = showroom(Layout::Carousel);
        {
            let log = Arc::clone(&log);
            showroom.on_view_changed(move |e| {
                log.lock().unwrap().push(format!("view {}", e.current));
            });
        }
        {
            let log = Arc::clone(&log);
            showroom.on_selected(move |e| {
                log.lock().unwrap().push(format!("select {}", e.index));
            });
        }
        {
            let log = Arc::clone(&log);
            showroom.on_deselected(move |e| {
                log.lock().unwrap().push(format!("deselect {}", e.index));
            });
        }
        {
            let log = Arc::clone(&log);
            showroom.on_texture_changed(move |t| {
                log.lock().unwrap().push(format!("texture {}", t.bytes().len()));
            });
        }

        showroom.next();
        showroom.select();
        showroom.set_texture(vec![1, 2, 3]);
        showroom.deselect();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["view 1", "select 1", "texture 3", "deselect 1"]
        );
    }
}
