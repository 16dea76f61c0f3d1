//! The image comparator widget: a static base layer with two independently
//! draggable overlay layers stacked on top.

use crate::dom::{Document, NodeId, NodeKind, PointerEvent, PointerEventKind, Rect};
use crate::handle::{Bounds, ImageComparatorHandle};
use crate::layer::{HandleBar, Layer, Scene};
use log::{debug, info};

pub const DEFAULT_WIDTH: f64 = 500.0;
pub const DEFAULT_HEIGHT: f64 = 300.0;

pub const DEFAULT_BASE_SRC: &str = "https://images.unsplash.com/photo-1664575196412-ed801e8333a1?ixlib=rb-1.2.1&ixid=MnwxMjA3fDF8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8&auto=format&fit=crop&w=2071&q=80";
pub const DEFAULT_OVERLAY_SRCS: [&str; 2] = [
    "https://images.unsplash.com/photo-1665502252515-8380abd497fe?ixlib=rb-1.2.1&ixid=MnwxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8&auto=format&fit=crop&w=2428&q=80",
    "https://images.unsplash.com/photo-1665507254439-fe45f1417c13?ixlib=rb-1.2.1&ixid=MnwxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8&auto=format&fit=crop&w=2070&q=80",
];
pub const DEFAULT_OVERLAY_BOUNDS: [Bounds; 2] =
    [Bounds::new(50.0, 500.0), Bounds::new(100.0, 500.0)];

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub src: String,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparatorConfig {
    pub width: f64,
    pub height: f64,
    pub base: String,
    pub overlays: [OverlayConfig; 2],
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            base: DEFAULT_BASE_SRC.to_string(),
            overlays: [0usize, 1].map(|i| OverlayConfig {
                src: DEFAULT_OVERLAY_SRCS[i].to_string(),
                bounds: DEFAULT_OVERLAY_BOUNDS[i],
            }),
        }
    }
}

#[derive(Debug)]
struct Overlay {
    layer: Layer,
    handle: ImageComparatorHandle,
}

impl Overlay {
    fn new(config: &OverlayConfig) -> Self {
        let handle = ImageComparatorHandle::new(config.bounds);
        let layer = Layer::new(config.src.as_str())
            .with_offset(handle.position())
            .with_handle_bar(HandleBar::new(handle.handle_ref()));
        Self { layer, handle }
    }
}

#[derive(Debug)]
pub struct ImageComparator {
    wrapper: Option<NodeId>,
    base: Layer,
    overlays: [Overlay; 2],
}

impl ImageComparator {
    /// Builds the widget's nodes into `document` and attaches the handles.
    pub fn mount(config: &ComparatorConfig, document: &mut Document) -> Self {
        let tree = document.tree_mut();
        let wrapper = tree.append(
            None,
            NodeKind::Wrapper,
            Rect::new(0.0, 0.0, config.width, config.height),
        );
        tree.set_clips_children(wrapper, true);

        let mut base = Layer::new(config.base.as_str());
        base.mount(tree, wrapper, config.width, config.height);

        let mut overlays = [
            Overlay::new(&config.overlays[0]),
            Overlay::new(&config.overlays[1]),
        ];
        for overlay in &mut overlays {
            overlay.layer.mount(tree, wrapper, config.width, config.height);
        }

        let mut comparator = Self {
            wrapper: Some(wrapper),
            base,
            overlays,
        };
        comparator.commit(document);
        info!(
            "Mounted image comparator {}x{} with handle bounds {:?} and {:?}",
            config.width,
            config.height,
            comparator.overlays[0].handle.bounds(),
            comparator.overlays[1].handle.bounds()
        );
        comparator
    }

    /// Pushes each handle's position into its layer and re-syncs listeners.
    pub fn commit(&mut self, document: &mut Document) {
        if self.wrapper.is_none() {
            return;
        }
        for overlay in &mut self.overlays {
            let position = overlay.handle.position();
            if position != overlay.layer.offset() {
                overlay.layer.set_offset(document.tree_mut(), position);
            }
            overlay.handle.sync(document);
        }
    }

    /// Delivers a pointer event to the document and commits the result.
    pub fn dispatch(
        &mut self,
        document: &mut Document,
        kind: PointerEventKind,
        x: f64,
        y: f64,
    ) -> PointerEvent {
        let event = document.dispatch(kind, x, y);
        self.commit(document);
        event
    }

    pub fn positions(&self) -> [f64; 2] {
        [
            self.overlays[0].handle.position(),
            self.overlays[1].handle.position(),
        ]
    }

    pub fn handle(&self, index: usize) -> Option<&ImageComparatorHandle> {
        self.overlays.get(index).map(|o| &o.handle)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        std::iter::once(&self.base).chain(self.overlays.iter().map(|o| &o.layer))
    }

    /// Image sources indexed by the slot each layer paints with.
    pub fn image_sources(&self) -> Vec<String> {
        self.layers().map(|layer| layer.src().to_string()).collect()
    }

    /// Paint list for the current frame: each layer's image followed by its
    /// handle bar, back to front.
    pub fn scene(&self, document: &Document) -> Scene {
        let Some(wrapper) = self.wrapper else {
            return Scene::default();
        };
        let tree = document.tree();
        let mut quads = Vec::new();
        for (slot, layer) in self.layers().enumerate() {
            layer.paint(tree, slot, &mut quads);
        }
        Scene {
            clip: tree.absolute_rect(wrapper),
            quads,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.wrapper.is_some()
    }

    /// Releases every listener and removes the widget's nodes. Idempotent.
    pub fn unmount(&mut self, document: &mut Document) {
        let Some(wrapper) = self.wrapper.take() else {
            return;
        };
        for overlay in &mut self.overlays {
            overlay.handle.unmount();
            overlay.layer.unmount(document.tree_mut());
        }
        self.base.unmount(document.tree_mut());
        document.tree_mut().remove(wrapper);
        debug!("Unmounted image comparator");
    }
}
