use crate::core::config::{MapConfig, ZoomAnchorMode};
use crate::core::constants::DEFAULT_ZOOM_SENSITIVITY;
use crate::core::geo::{Point, Size, WorldPoint};
use crate::core::viewport::ViewportHandle;
use crate::input::events::{EventHandled, InputEvent, MouseButton};

/// Drag gesture state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Pointer position when the drag began
        start: Point,
        /// Viewport center when the drag began
        start_center: WorldPoint,
    },
}

/// Turns pointer and wheel gestures into viewport changes.
///
/// Dragging is absolute: every move recomputes the center from the position
/// and center recorded at pointer-down, so no error accumulates and the
/// center at pointer-up is final. Zoom limits and pan bounds are enforced by
/// the viewport setters.
#[derive(Debug)]
pub struct InteractionController {
    pub enabled: bool,
    pub pan_on_drag: bool,
    pub zoom_on_wheel: bool,
    /// Zoom levels per wheel delta unit
    pub zoom_sensitivity: f64,
    zoom_anchor_mode: ZoomAnchorMode,
    viewport: ViewportHandle,
    drag: DragState,
}

impl InteractionController {
    pub fn new(viewport: ViewportHandle, config: &MapConfig) -> Self {
        Self {
            enabled: true,
            pan_on_drag: true,
            zoom_on_wheel: true,
            zoom_sensitivity: DEFAULT_ZOOM_SENSITIVITY,
            zoom_anchor_mode: config.zoom_anchor_mode(),
            viewport,
            drag: DragState::Idle,
        }
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn zoom_anchor_mode(&self) -> ZoomAnchorMode {
        self.zoom_anchor_mode
    }

    /// Applies one input event; `canvas` is the current surface size
    pub fn handle_event(&mut self, event: &InputEvent, canvas: Size) -> EventHandled {
        if !self.enabled {
            return EventHandled::NotHandled;
        }

        match *event {
            InputEvent::PointerDown { position, button } => {
                if !self.pan_on_drag || button != MouseButton::Left {
                    return EventHandled::NotHandled;
                }
                self.drag = DragState::Dragging {
                    start: position,
                    start_center: self.viewport.center(),
                };
                log::trace!("drag started at {:?}", position);
                EventHandled::Handled
            }
            InputEvent::PointerMove { position } => match self.drag {
                DragState::Dragging {
                    start,
                    start_center,
                } => {
                    let delta = position.subtract(&start);
                    self.viewport.update(|viewport| {
                        let scale = viewport.scale();
                        viewport.set_center(WorldPoint::new(
                            start_center.x - delta.x / scale,
                            start_center.y - delta.y / scale,
                        ));
                    });
                    EventHandled::Handled
                }
                DragState::Idle => EventHandled::NotHandled,
            },
            InputEvent::PointerUp { .. } => {
                if self.is_dragging() {
                    self.drag = DragState::Idle;
                    log::trace!("drag ended at center {:?}", self.viewport.center());
                    EventHandled::Handled
                } else {
                    EventHandled::NotHandled
                }
            }
            InputEvent::Wheel { delta_y, position } => {
                if !self.zoom_on_wheel || !delta_y.is_finite() {
                    return EventHandled::NotHandled;
                }
                let delta_zoom = -delta_y * self.zoom_sensitivity;
                let anchor_mode = self.zoom_anchor_mode;
                self.viewport.update(|viewport| match anchor_mode {
                    ZoomAnchorMode::Pointer => viewport.zoom_around(position, canvas, delta_zoom),
                    ZoomAnchorMode::ViewportCenter => viewport.set_zoom(viewport.zoom() + delta_zoom),
                });
                log::trace!("wheel zoom to {:.3}", self.viewport.zoom());
                EventHandled::Handled
            }
            InputEvent::Resize { .. } => EventHandled::NotHandled,
        }
    }
}
