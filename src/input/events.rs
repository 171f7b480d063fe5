use crate::core::geo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Input events that can be handled by the map. Positions are canvas pixels
/// relative to the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Button pressed over the canvas
    PointerDown {
        position: Point,
        button: MouseButton,
    },
    /// Pointer moved, pressed or not
    PointerMove { position: Point },
    /// Button released (anywhere, the drag may have left the canvas)
    PointerUp { position: Point },
    /// Scroll wheel; positive `delta_y` scrolls down and zooms out
    Wheel { delta_y: f64, position: Point },
    /// Canvas resized
    Resize { size: Size },
}

/// Whether an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

impl EventHandled {
    pub fn is_handled(self) -> bool {
        self == EventHandled::Handled
    }
}

/// Mouse button types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_deserialize() {
        let event: InputEvent = serde_json::from_str(
            r#"{ "Wheel": { "delta_y": 100.0, "position": { "x": 1.0, "y": 2.0 } } }"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InputEvent::Wheel {
                delta_y: 100.0,
                position: Point::new(1.0, 2.0)
            }
        );
    }
}
