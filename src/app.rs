use crate::event::MonitorCommand;
use crate::event_store::TrackedShow;
use crate::monitor::Dashboard;
use crate::show::UpcomingShow;
use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, error};
use ratatui::{Terminal, backend::Backend};
use std::io;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const FRAME_POLL: Duration = Duration::from_millis(250);

pub struct App {
    pub should_quit: bool,
    pub dashboard: Dashboard,
    pub selected_index: Option<usize>,
    commands: mpsc::UnboundedSender<MonitorCommand>,
}

impl App {
    pub fn new(dashboard: Dashboard, commands: mpsc::UnboundedSender<MonitorCommand>) -> App {
        let mut app = App { should_quit: false, dashboard, selected_index: None, commands };
        app.select_initial_item();
        app
    }

    fn select_initial_item(&mut self) {
        self.selected_index = if self.dashboard.shows.is_empty() { None } else { Some(0) };
    }

    /// Swaps in a fresh dashboard, keeping the same show selected if it is
    /// still listed.
    pub fn update_dashboard(&mut self, dashboard: Dashboard) {
        let previously_selected: Option<UpcomingShow> =
            self.selected_show().map(|tracked| tracked.show().clone());
        self.dashboard = dashboard;

        let shows = &self.dashboard.shows;
        self.selected_index = match previously_selected {
            Some(show) => shows
                .iter()
                .position(|tracked| tracked.show() == &show)
                .or_else(|| self.selected_index.map(|i| i.min(shows.len().saturating_sub(1))))
                .filter(|_| !shows.is_empty()),
            None if !shows.is_empty() => Some(0),
            None => None,
        };
    }

    // =================================== Scrolling SHOWs =========================================
    pub fn select_next_show(&mut self) {
        let len = self.dashboard.shows.len();
        if len == 0 {
            self.selected_index = None;
            return;
        }
        self.selected_index = Some(self.selected_index.map_or(0, |i| (i + 1) % len));
    }

    pub fn select_prev_show(&mut self) {
        let len = self.dashboard.shows.len();
        if len == 0 {
            self.selected_index = None;
            return;
        }
        self.selected_index = Some(self.selected_index.map_or(len - 1, |i| (i + len - 1) % len));
    }

    pub fn selected_show(&self) -> Option<&TrackedShow> {
        self.selected_index.and_then(|i| self.dashboard.shows.get(i))
    }

    pub fn request_refresh(&self) {
        debug!("App: manual refresh requested");
        if self.commands.send(MonitorCommand::RefreshNow).is_err() {
            error!("App: monitor is gone, cannot refresh");
        }
    }

    // --- Key Handler ---
    pub fn on_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                let _ = self.commands.send(MonitorCommand::Shutdown);
            }
            KeyCode::Down | KeyCode::Char('j') => self.select_next_show(),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev_show(),
            KeyCode::Char('r') => self.request_refresh(),
            _ => {}
        }
    }
}

pub fn start_ui(mut app: App, mut dashboard_rx: watch::Receiver<Dashboard>) -> Result<()> {
    // Set up the terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, &mut app, &mut dashboard_rx);

    // Restore the terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

pub fn run_app_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    dashboard_rx: &mut watch::Receiver<Dashboard>,
) -> Result<()> {
    while !app.should_quit {
        match dashboard_rx.has_changed() {
            Ok(true) => app.update_dashboard(dashboard_rx.borrow_and_update().clone()),
            Ok(false) => {}
            // Monitor stopped.
            Err(_) => app.should_quit = true,
        }

        let now = Utc::now();
        terminal.draw(|f| crate::ui::ui(f, app, now))?;

        if event::poll(FRAME_POLL)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    app.on_key(key_event.code);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::EventStore;
    use chrono::TimeZone;
    use url::Url;

    fn dashboard(titles: &[&str]) -> Dashboard {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let shows: Vec<UpcomingShow> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                UpcomingShow::new(
                    title.to_string(),
                    now + chrono::Duration::minutes(10 * (i as i64 + 1)),
                    false,
                    "Video".to_string(),
                    None,
                )
            })
            .collect();
        let mut store = EventStore::new();
        store.reconcile(&shows, now);

        let mut dashboard = Dashboard::new(Url::parse("http://example.com/feed").unwrap());
        dashboard.shows = store.shows().to_vec();
        dashboard
    }

    fn app(titles: &[&str]) -> (App, mpsc::UnboundedReceiver<MonitorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(dashboard(titles), tx), rx)
    }

    #[test]
    fn selection_wraps() {
        let (mut app, _rx) = app(&["A", "B", "C"]);
        assert_eq!(app.selected_index, Some(0));
        app.on_key(KeyCode::Up);
        assert_eq!(app.selected_index, Some(2));
        app.on_key(KeyCode::Down);
        assert_eq!(app.selected_index, Some(0));
        app.on_key(KeyCode::Char('j'));
        assert_eq!(app.selected_show().map(|t| t.show().title()), Some("B"));
    }

    #[test]
    fn empty_list_has_no_selection() {
        let (mut app, _rx) = app(&[]);
        assert_eq!(app.selected_index, None);
        app.select_next_show();
        assert_eq!(app.selected_index, None);
    }

    #[test]
    fn selection_follows_show_across_updates() {
        let (mut app, _rx) = app(&["A", "B", "C"]);
        app.select_next_show();
        app.select_next_show();
        assert_eq!(app.selected_show().map(|t| t.show().title()), Some("C"));

        // "A" started and dropped off; "C" moved up to index 1.
        let mut next = dashboard(&["A", "B", "C"]);
        next.shows.remove(0);
        app.update_dashboard(next);
        assert_eq!(app.selected_show().map(|t| t.show().title()), Some("C"));

        app.update_dashboard(dashboard(&[]));
        assert_eq!(app.selected_index, None);
    }

    #[test]
    fn keys_send_commands() {
        let (mut app, mut rx) = app(&["A"]);
        app.on_key(KeyCode::Char('r'));
        assert_eq!(rx.try_recv().unwrap(), MonitorCommand::RefreshNow);
        app.on_key(KeyCode::Char('q'));
        assert!(app.should_quit);
        assert_eq!(rx.try_recv().unwrap(), MonitorCommand::Shutdown);
    }
}
