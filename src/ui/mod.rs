mod inbox;
pub mod theme;
mod widgets;

use ratatui::Frame;

use crate::app::state::AppState;

pub fn render(frame: &mut Frame, state: &AppState) {
    inbox::render_inbox(frame, state);
}
