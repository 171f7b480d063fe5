pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{EventHandled, InputEvent, MouseButton};
pub use handler::{DragState, InteractionController};
