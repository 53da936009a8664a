//! Keyboard input handling

use super::App;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

impl App {
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Handle Ctrl+C always
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        if self.show_help {
            // Any key closes help
            self.show_help = false;
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Char('s') => self.stop(),
            KeyCode::Char('r') => self.restart(),
            KeyCode::Tab => self.cycle_panel(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentdeckConfig;
    use crate::replay::scheduler::Phase;
    use crate::replay::{CaseEvent, CaseScript};
    use serde_json::json;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn app() -> App {
        let script = CaseScript::new(vec![CaseEvent {
            kind: "log-new".to_string(),
            content: json!("boot"),
            delay: None,
        }]);
        App::new(script, "case", &AgentdeckConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys() {
        let cases = vec![
            (KeyCode::Char('s'), Phase::Cancelled, false),
            (KeyCode::Char('r'), Phase::Running, false),
            (KeyCode::Esc, Phase::Cancelled, true),
        ];
        let mut app = app();
        app.start();
        for (code, phase, quit) in cases {
            press(&mut app, code);
            assert_eq!(app.replay.phase(), phase, "after {code:?}");
            assert_eq!(app.should_quit, quit, "quit after {code:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_c_quits_from_help() {
        let mut app = app();
        app.start();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);

        // Plain keys only close the help popup
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.show_help);
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Char('?'));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(app.deadline().is_none());
    }
}
