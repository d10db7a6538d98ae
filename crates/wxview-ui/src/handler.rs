use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        // Redrawn on the next loop iteration
        AppEvent::Resize(_, _) => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('u') => app.clear_input(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => {
            if app.submit().is_none() {
                tracing::debug!("Ignoring empty search");
            }
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::app_with_base_url;

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    #[test]
    fn test_typing_edits_query() {
        let (mut app, _rx) = app_with_base_url("http://127.0.0.1:9");
        for c in "Lima".chars() {
            handle_event(&mut app, press(KeyCode::Char(c)));
        }
        handle_event(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.state.query_text, "Lim");

        handle_event(&mut app, ctrl('u'));
        assert!(app.state.query_text.is_empty());
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _rx) = app_with_base_url("http://127.0.0.1:9");
        handle_event(&mut app, press(KeyCode::Esc));
        assert!(app.should_quit);

        let (mut app, _rx) = app_with_base_url("http://127.0.0.1:9");
        handle_event(&mut app, ctrl('c'));
        assert!(app.should_quit);
        assert!(app.state.query_text.is_empty());
    }

    #[test]
    fn test_enter_on_empty_input_does_nothing() {
        let (mut app, _rx) = app_with_base_url("http://127.0.0.1:9");
        handle_event(&mut app, press(KeyCode::Enter));
        assert!(app.state.latest().is_none());
        assert!(!app.state.loading);
    }

    #[tokio::test]
    async fn test_enter_submits() {
        let (mut app, _rx) = app_with_base_url("http://127.0.0.1:9");
        app.state.query_text = "Lima".into();
        handle_event(&mut app, press(KeyCode::Enter));
        assert!(app.state.latest().is_some());
        assert!(app.state.loading);
    }
}
