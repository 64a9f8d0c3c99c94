use crate::api::{HttpBackend, RestClient, StudentApi, StudentQueryKey};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryClient;
use crate::routes::Route;
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{FormMode, StudentFormView, StudentListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Main application state
pub struct App {
  /// Navigation stack - the list is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Student endpoints
  api: StudentApi,

  /// Query cache shared by every view
  client: QueryClient<StudentQueryKey>,

  /// Backend label for the header
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, route: Route) -> Result<Self> {
    let rest = RestClient::new(&config.api)?;
    info!(base_url = %config.api.base_url, "starting");
    Ok(Self::with_backend(
      Arc::new(rest),
      config.display_title(),
      route,
    ))
  }

  /// Build the app over any backend, opening `route`
  pub fn with_backend(http: Arc<dyn HttpBackend>, title: String, route: Route) -> Self {
    let mut app = Self {
      view_stack: Vec::new(),
      api: StudentApi::new(http),
      client: QueryClient::new(),
      title,
      should_quit: false,
    };
    app.navigate(route);
    app
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    // Cache writes re-render whichever views show the affected key
    let tx = events.sender();
    let _subscription = self.client.subscribe(move |key| {
      let _ = tx.send(Event::CacheUpdated(key.clone()));
    });

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::CacheUpdated(key) => {
        for view in self.view_stack.iter_mut() {
          view.on_cache_update(&key);
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Pop,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Navigate(route) => self.navigate(route),
      ViewAction::Pop => self.pop(),
    }
  }

  fn tick(&mut self) {
    for view in self.view_stack.iter_mut() {
      view.tick();
    }
    let evicted = self.client.collect_garbage();
    if evicted > 0 {
      debug!(evicted, "cache entries evicted");
    }
  }

  /// Open `route`. The list replaces the whole stack; forms open on top of
  /// it so going back returns to the list.
  pub fn navigate(&mut self, route: Route) {
    debug!(%route, "navigate");
    match route {
      Route::StudentList { page } => {
        self.view_stack.clear();
        self.view_stack.push(Box::new(StudentListView::new(
          page,
          self.api.clone(),
          self.client.clone(),
        )));
      }
      Route::AddStudent | Route::EditStudent { .. } => {
        if self.view_stack.is_empty() {
          self.navigate(Route::default());
        }
        // Replace an open form rather than stacking forms
        if self.view_stack.len() > 1 {
          self.view_stack.truncate(1);
        }
        let mode = match route {
          Route::EditStudent { id } => FormMode::Edit { id },
          _ => FormMode::Add,
        };
        self.view_stack.push(Box::new(StudentFormView::new(
          mode,
          self.api.clone(),
          self.client.clone(),
        )));
      }
    }
  }

  fn pop(&mut self) {
    if self.view_stack.len() > 1 {
      self.view_stack.pop();
    } else {
      self.should_quit = true;
    }
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  #[cfg(test)]
  fn route(&self) -> Option<Route> {
    self.view_stack.last().map(|v| v.route())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::memory::MemoryBackend;
  use crate::query::testing::settle;
  use crate::ui::testing::{ctrl_key, key};
  use ratatui::backend::TestBackend;

  fn test_app(route: Route) -> (App, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::seeded(25));
    let app = App::with_backend(backend.clone(), "memory".to_string(), route);
    (app, backend)
  }

  #[tokio::test]
  async fn test_add_opens_on_top_of_list() {
    let (mut app, _backend) = test_app(Route::StudentList { page: 2 });
    settle().await;

    app.handle_event(Event::Key(key(KeyCode::Char('a'))));
    assert_eq!(app.route(), Some(Route::AddStudent));
    assert_eq!(app.breadcrumb(), vec!["Students [page 2]", "Add"]);

    app.handle_event(Event::Key(key(KeyCode::Esc)));
    assert_eq!(app.route(), Some(Route::StudentList { page: 2 }));
    assert!(!app.should_quit);
  }

  #[tokio::test]
  async fn test_deep_link_to_form_keeps_list_below() {
    let (mut app, backend) = test_app(Route::EditStudent { id: 7 });
    settle().await;

    assert_eq!(app.view_stack.len(), 2);
    assert!(backend.calls().contains(&"GET students/7".to_string()));

    app.handle_event(Event::Key(key(KeyCode::Esc)));
    assert_eq!(app.route(), Some(Route::StudentList { page: 1 }));
  }

  #[tokio::test]
  async fn test_quit_keys() {
    let (mut app, _backend) = test_app(Route::default());
    app.handle_event(Event::Key(key(KeyCode::Char('q'))));
    assert!(app.should_quit);

    let (mut app, _backend) = test_app(Route::AddStudent);
    app.handle_event(Event::Key(ctrl_key(KeyCode::Char('c'))));
    assert!(app.should_quit);
  }

  #[tokio::test(start_paused = true)]
  async fn test_tick_evicts_unobserved_pages() {
    let (mut app, _backend) = test_app(Route::StudentList { page: 1 });
    settle().await;

    app.handle_event(Event::Key(key(KeyCode::Char('l'))));
    settle().await;
    assert!(app.client.contains(&StudentQueryKey::Students { page: 1 }));

    tokio::time::advance(Duration::from_secs(5)).await;
    app.handle_event(Event::Tick);
    assert!(!app.client.contains(&StudentQueryKey::Students { page: 1 }));
    assert!(app.client.contains(&StudentQueryKey::Students { page: 2 }));
  }

  #[tokio::test]
  async fn test_draw_shows_header_and_breadcrumb() {
    let (mut app, _backend) = test_app(Route::StudentList { page: 1 });
    settle().await;

    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    terminal.draw(|frame| ui::draw(frame, &mut app)).unwrap();

    let buffer = terminal.backend().buffer();
    let header: String = (0..buffer.area.width)
      .map(|x| buffer[(x, 0)].symbol().to_string())
      .collect();
    assert!(header.contains("memory"));
    assert!(header.contains("/students/?page=1"));
    let footer: String = (0..buffer.area.width)
      .map(|x| buffer[(x, buffer.area.height - 1)].symbol().to_string())
      .collect();
    assert!(footer.contains("Students [page 1]"));
  }
}
