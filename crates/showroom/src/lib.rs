//! Engine-independent core of a 3D car configurator.
//!
//! A [`Showroom`] holds an ordered [`Registry`] of cars (or themed scenes, each
//! with a car), tracks which one is viewed and which one is selected for
//! customizing, and brokers paint choices onto the selected car's colorable
//! parts. Every state change produces [`StageCommand`]s that a renderer
//! carries out through the [`Presentation`] trait. Asset loads are tracked per
//! entity so that a superseded load never lands on stage.
//!
//! Changes are also broadcast on synchronous [`EventStream`]s for anything
//! else that wants to follow along.

pub mod catalog;
pub mod error;
pub mod events;
pub mod layout;
pub mod loading;
pub mod paint;
pub mod registry;
pub mod session;
pub mod stage;
pub mod viewer;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use events::{EventStream, SubscriptionId};
pub use loading::{LoadFailed, LoadOutcome, LoadTicket, LoadTracker};
pub use paint::{ColorChoice, DEFAULT_PALETTE, ImageFormat, PaintBroker, Rgb, TextureData};
pub use registry::{
    Capabilities, Entity, EntityId, Environment, Fog, Headlight, PartId, Placement,
    PointLightSpec, Registry,
};
pub use session::Showroom;
pub use stage::{Framing, Layout, Presentation, StageCommand, StageDirector};
pub use viewer::{Deselected, Selected, ViewChanged, Viewer};
