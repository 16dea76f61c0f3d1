//! Presentational pieces of the comparator: the handle bar and the image
//! layer. Neither holds state beyond the nodes it created.

use crate::dom::{NodeId, NodeKind, NodeTree, Rect};
use crate::handle::HandleRef;

pub const HANDLE_BAR_WIDTH: f64 = 4.0;
pub const HANDLE_HOLDER_WIDTH: f64 = 16.0;
pub const HANDLE_HOLDER_HEIGHT: f64 = 40.0;

pub const HANDLE_BAR_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.8];
pub const HANDLE_HOLDER_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// Image of the given layer slot, stretched over the quad.
    Image(usize),
    Solid([f32; 4]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub rect: Rect,
    pub fill: Fill,
}

/// Everything needed to paint one frame of the widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub clip: Rect,
    pub quads: Vec<Quad>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HandleBarNodes {
    bar: NodeId,
    holder: NodeId,
}

/// Thin vertical bar along a layer's left edge with a grab holder centred
/// on it. The holder node is written into the supplied [`HandleRef`].
#[derive(Debug, Clone)]
pub struct HandleBar {
    handle_ref: HandleRef,
    nodes: Option<HandleBarNodes>,
}

impl HandleBar {
    pub fn new(handle_ref: HandleRef) -> Self {
        Self {
            handle_ref,
            nodes: None,
        }
    }

    fn mount(&mut self, tree: &mut NodeTree, parent: NodeId, height: f64) {
        let bar = tree.append(
            Some(parent),
            NodeKind::HandleBar,
            Rect::new(0.0, 0.0, HANDLE_BAR_WIDTH, height),
        );
        let holder = tree.append(
            Some(bar),
            NodeKind::HandleHolder,
            Rect::new(
                (HANDLE_BAR_WIDTH - HANDLE_HOLDER_WIDTH) / 2.0,
                (height - HANDLE_HOLDER_HEIGHT) / 2.0,
                HANDLE_HOLDER_WIDTH,
                HANDLE_HOLDER_HEIGHT,
            ),
        );
        self.handle_ref.set(holder);
        self.nodes = Some(HandleBarNodes { bar, holder });
    }

    fn unmount(&mut self) {
        self.handle_ref.clear();
        self.nodes = None;
    }

    pub fn holder(&self) -> Option<NodeId> {
        self.nodes.map(|n| n.holder)
    }

    fn paint(&self, tree: &NodeTree, out: &mut Vec<Quad>) {
        let Some(nodes) = self.nodes else {
            return;
        };
        out.push(Quad {
            rect: tree.absolute_rect(nodes.bar),
            fill: Fill::Solid(HANDLE_BAR_COLOR),
        });
        out.push(Quad {
            rect: tree.absolute_rect(nodes.holder),
            fill: Fill::Solid(HANDLE_HOLDER_COLOR),
        });
    }
}

/// One image shifted horizontally by `offset` pixels, optionally carrying a
/// handle bar.
#[derive(Debug, Clone)]
pub struct Layer {
    src: String,
    offset: f64,
    handle_bar: Option<HandleBar>,
    container: Option<NodeId>,
}

impl Layer {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            offset: 0.0,
            handle_bar: None,
            container: None,
        }
    }

    pub fn with_handle_bar(mut self, handle_bar: HandleBar) -> Self {
        self.handle_bar = Some(handle_bar);
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn handle_bar(&self) -> Option<&HandleBar> {
        self.handle_bar.as_ref()
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// Builds the container, image and handle bar nodes under `parent`.
    pub fn mount(&mut self, tree: &mut NodeTree, parent: NodeId, width: f64, height: f64) {
        let container = tree.append(
            Some(parent),
            NodeKind::ImageContainer,
            Rect::new(0.0, 0.0, width, height),
        );
        tree.append(
            Some(container),
            NodeKind::Image,
            Rect::new(0.0, 0.0, width, height),
        );
        if let Some(handle_bar) = &mut self.handle_bar {
            handle_bar.mount(tree, container, height);
        }
        self.container = Some(container);
        tree.set_translate_x(container, self.offset);
    }

    pub fn unmount(&mut self, tree: &mut NodeTree) {
        if let Some(handle_bar) = &mut self.handle_bar {
            handle_bar.unmount();
        }
        if let Some(container) = self.container.take() {
            tree.remove(container);
        }
    }

    pub fn set_offset(&mut self, tree: &mut NodeTree, offset: f64) {
        self.offset = offset;
        if let Some(container) = self.container {
            tree.set_translate_x(container, offset);
        }
    }

    pub fn paint(&self, tree: &NodeTree, slot: usize, out: &mut Vec<Quad>) {
        let Some(container) = self.container else {
            return;
        };
        out.push(Quad {
            rect: tree.absolute_rect(container),
            fill: Fill::Image(slot),
        });
        if let Some(handle_bar) = &self.handle_bar {
            handle_bar.paint(tree, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(tree: &mut NodeTree) -> NodeId {
        tree.append(None, NodeKind::Wrapper, Rect::new(0.0, 0.0, 500.0, 300.0))
    }

    #[test]
    fn layer_without_handle_paints_only_image() {
        let mut tree = NodeTree::new();
        let root = wrapper(&mut tree);
        let mut layer = Layer::new("base.png");
        layer.mount(&mut tree, root, 500.0, 300.0);

        let mut quads = Vec::new();
        layer.paint(&tree, 0, &mut quads);
        assert_eq!(
            quads,
            vec![Quad {
                rect: Rect::new(0.0, 0.0, 500.0, 300.0),
                fill: Fill::Image(0),
            }]
        );
    }

    #[test]
    fn handle_bar_writes_holder_into_ref() {
        let mut tree = NodeTree::new();
        let root = wrapper(&mut tree);
        let handle_ref = HandleRef::new();
        let mut layer = Layer::new("top.png").with_handle_bar(HandleBar::new(handle_ref.clone()));
        layer.mount(&mut tree, root, 500.0, 300.0);

        let holder = handle_ref.get().expect("holder attached");
        assert_eq!(tree.kind(holder), Some(NodeKind::HandleHolder));
        assert_eq!(layer.handle_bar().and_then(HandleBar::holder), Some(holder));
        assert_eq!(tree.absolute_rect(holder), Rect::new(-6.0, 130.0, 16.0, 40.0));

        layer.unmount(&mut tree);
        assert_eq!(handle_ref.get(), None);
        assert!(!tree.is_attached(holder));
    }

    #[test]
    fn offset_translates_image_and_handle() {
        let mut tree = NodeTree::new();
        let root = wrapper(&mut tree);
        let mut layer = Layer::new("top.png")
            .with_offset(50.0)
            .with_handle_bar(HandleBar::new(HandleRef::new()));
        layer.mount(&mut tree, root, 500.0, 300.0);
        layer.set_offset(&mut tree, 120.0);

        let mut quads = Vec::new();
        layer.paint(&tree, 2, &mut quads);
        assert_eq!(quads.len(), 3);
        assert_eq!(quads[0].rect.x, 120.0);
        assert_eq!(quads[0].fill, Fill::Image(2));
        assert_eq!(quads[1].rect, Rect::new(120.0, 0.0, 4.0, 300.0));
        assert_eq!(quads[2].rect.x, 114.0);

        let container = layer.container().expect("mounted");
        assert_eq!(tree.translate_x(container), 120.0);
    }
}
