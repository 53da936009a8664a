//! Terminal viewer events

pub mod input;

/// Events delivered to the viewer's main loop
#[derive(Debug)]
pub enum Event {
    /// Keyboard input
    Key(crossterm::event::KeyEvent),
    /// Terminal was resized; only a redraw is needed
    Resize,
}
