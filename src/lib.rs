//! A layered image comparator: a base image with two overlay images, each
//! slid horizontally by dragging its own handle.

pub mod app;
pub mod comparator;
pub mod dom;
pub mod handle;
pub mod image_loader;
pub mod layer;
pub mod render;

pub use comparator::{ComparatorConfig, ImageComparator, OverlayConfig};
pub use dom::{Document, PointerEventKind};
pub use handle::{Bounds, DragState, ImageComparatorHandle};
