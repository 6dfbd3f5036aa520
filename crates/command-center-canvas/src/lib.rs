//! Canvas surfaces — agent-pushed UI directives mirrored to live viewers.
//!
//! The agent renders and deletes named surfaces; the [`CanvasManager`]
//! persists each change and fans it out to every connected viewer. Viewers
//! report interactions back as callbacks, kept in a bounded log.

pub mod callbacks;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod store;

pub use manager::{CanvasManager, DeleteOutcome, DeliveryReport};
pub use protocol::{CallbackEntry, CallbackReport, CanvasEvent, RenderRequest, Surface};
pub use registry::{ViewerHandle, ViewerId};
pub use store::SurfaceStore;
