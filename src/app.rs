use crate::comparator::{ComparatorConfig, ImageComparator};
use crate::dom::{Document, PointerEventKind};
use crate::image_loader;
use crate::render::Renderer;
use anyhow::Result;
use log::{debug, info};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, WindowEvent},
    window::Window,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub comparator: ComparatorConfig,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            comparator: ComparatorConfig::default(),
            window_width: 800.0,
            window_height: 600.0,
        }
    }
}

/// Translates window input into document pointer events, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerTracker {
    cursor: (f64, f64),
    scale_factor: f64,
}

impl PointerTracker {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            cursor: (0.0, 0.0),
            scale_factor,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    pub fn cursor(&self) -> (f64, f64) {
        self.cursor
    }

    /// Maps a window event onto a pointer event kind and its logical
    /// position. Every mouse button counts, like DOM mouse events.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<(PointerEventKind, f64, f64)> {
        let kind = match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = self.to_logical(*position);
                PointerEventKind::Move
            }
            WindowEvent::MouseInput { state, .. } => match state {
                ElementState::Pressed => PointerEventKind::Down,
                ElementState::Released => PointerEventKind::Up,
            },
            _ => return None,
        };
        Some((kind, self.cursor.0, self.cursor.1))
    }

    fn to_logical(&self, position: PhysicalPosition<f64>) -> (f64, f64) {
        let logical = position.to_logical::<f64>(self.scale_factor);
        (logical.x, logical.y)
    }
}

pub struct AppState {
    document: Document,
    comparator: ImageComparator,
    renderer: Renderer,
    pointer: PointerTracker,
}

impl AppState {
    pub async fn new(window: &Window, config: AppConfig) -> Result<Self> {
        info!("Initializing AppState");
        let mut document = Document::new();
        let comparator = ImageComparator::mount(&config.comparator, &mut document);

        let images = image_loader::load_images(&comparator.image_sources());
        let broken = images.iter().filter(|i| i.broken).count();
        if broken > 0 {
            info!("{} of {} image(s) failed to load", broken, images.len());
        }

        let mut renderer = Renderer::new(window).await?;
        renderer.upload_images(&images);
        info!("AppState initialized successfully");
        Ok(Self {
            document,
            comparator,
            renderer,
            pointer: PointerTracker::new(window.scale_factor()),
        })
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.renderer.resize(*size),
            WindowEvent::ScaleFactorChanged {
                scale_factor,
                new_inner_size,
            } => {
                self.pointer.set_scale_factor(*scale_factor);
                self.renderer.resize(**new_inner_size);
            }
            _ => {
                if let Some((kind, x, y)) = self.pointer.translate(event) {
                    let before = self.comparator.positions();
                    self.comparator.dispatch(&mut self.document, kind, x, y);
                    let after = self.comparator.positions();
                    if before != after {
                        debug!("Handle positions {:?} -> {:?}", before, after);
                    }
                }
            }
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let scene = self.comparator.scene(&self.document);
        self.renderer.render(&scene, self.pointer.scale_factor())
    }

    /// Reconfigures the surface at its current size, e.g. after it was lost.
    pub fn reconfigure(&mut self) {
        let size = self.renderer.size();
        self.renderer.resize(size);
    }

    pub fn shutdown(&mut self) {
        self.comparator.unmount(&mut self.document);
        info!("AppState shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::{DeviceId, ModifiersState, MouseButton};

    fn device() -> DeviceId {
        // SAFETY: only used as an opaque tag in synthesized events.
        unsafe { DeviceId::dummy() }
    }

    #[allow(deprecated)]
    fn cursor_moved(x: f64, y: f64) -> WindowEvent<'static> {
        WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(x, y),
            modifiers: ModifiersState::empty(),
        }
    }

    #[allow(deprecated)]
    fn mouse(state: ElementState, button: MouseButton) -> WindowEvent<'static> {
        WindowEvent::MouseInput {
            device_id: device(),
            state,
            button,
            modifiers: ModifiersState::empty(),
        }
    }

    #[test]
    fn cursor_moves_are_converted_to_logical_pixels() {
        let mut tracker = PointerTracker::new(2.0);
        assert_eq!(
            tracker.translate(&cursor_moved(600.0, 300.0)),
            Some((PointerEventKind::Move, 300.0, 150.0))
        );
        assert_eq!(tracker.cursor(), (300.0, 150.0));
    }

    #[test]
    fn buttons_report_at_last_cursor_position() {
        let mut tracker = PointerTracker::new(1.0);
        tracker.translate(&cursor_moved(42.0, 7.0));
        assert_eq!(
            tracker.translate(&mouse(ElementState::Pressed, MouseButton::Left)),
            Some((PointerEventKind::Down, 42.0, 7.0))
        );
        assert_eq!(
            tracker.translate(&mouse(ElementState::Released, MouseButton::Right)),
            Some((PointerEventKind::Up, 42.0, 7.0))
        );
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut tracker = PointerTracker::new(1.0);
        assert_eq!(tracker.translate(&WindowEvent::Focused(true)), None);
    }
}
