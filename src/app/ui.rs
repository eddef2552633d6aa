use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{prelude::*, widgets::*};
use std::{
    io,
    time::{Duration, Instant},
};

use crate::app::client::ApiClient;
use crate::app::{task_input::*, task_list::*};

pub struct App {
    pub items: TaskList,
    pub input: TaskInputState,
    // Shown on top of everything until a key is pressed
    pub notification: Option<String>,
    client: ApiClient,
}

impl App {
    // Fetch the list once; afterwards the view only follows its own changes
    pub fn connect(client: ApiClient) -> App {
        let mut app = App {
            items: TaskList::default(),
            input: TaskInputState::default(),
            notification: None,
            client,
        };
        app.reload();
        app
    }

    pub fn reload(&mut self) {
        match self.client.list_tasks() {
            Ok(tasks) => self.items = TaskList::from_server(tasks),
            Err(err) => self.notify("Failed to load tasks. Press r to retry.", err),
        }
    }

    fn notify(&mut self, message: &str, err: anyhow::Error) {
        self.notification = Some(format!("{message}\n\n{err:#}"));
    }

    // Send the typed text; the new task lands on top of the list
    pub fn add_task(&mut self) {
        let Some(text) = self.input.submission() else {
            self.notification = Some("Please enter a task!".to_string());
            return;
        };
        match self.client.create_task(&text) {
            Ok(task) => {
                self.items.on_created(task);
                self.input.close();
            }
            Err(err) => self.notify("Failed to add task. Please try again.", err),
        }
    }

    pub fn toggle_selected(&mut self) {
        let Some((id, completed)) = self
            .items
            .get_selected()
            .map(|task| (task.id, !task.completed))
        else {
            return;
        };
        match self.client.set_completed(id, completed) {
            Ok(_) => self.items.on_toggled(id, completed),
            Err(err) => self.notify("Failed to update task. Please try again.", err),
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.items.get_selected().map(|task| task.id) else {
            return;
        };
        match self.client.delete_task(id) {
            Ok(()) => self.items.on_deleted(id),
            Err(err) => self.notify("Failed to delete task. Please try again.", err),
        }
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| draw_ui(f, &mut app))?;
        let timeout = next_poll_timeout(&mut last_tick, tick_rate);

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.notification.is_some() {
                    app.notification = None;
                } else if app.input.active {
                    // Handle input for the new task line
                    match key.code {
                        KeyCode::Esc => app.input.close(),
                        KeyCode::Enter => app.add_task(),
                        KeyCode::Left => app.input.move_cursor_left(),
                        KeyCode::Right => app.input.move_cursor_right(),
                        KeyCode::Backspace => app.input.delete_char(),
                        KeyCode::Char(to_insert) => app.input.input(to_insert),
                        _ => {}
                    }
                } else {
                    // Handle input for the task list navigation and state change
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('a') => app.input.open(),
                        KeyCode::Char('x') => app.delete_selected(),
                        KeyCode::Char('r') => app.reload(),
                        KeyCode::Left => app.items.unselect(),
                        KeyCode::Down => app.items.next(),
                        KeyCode::Up => app.items.previous(),
                        KeyCode::Enter => app.toggle_selected(),
                        _ => {}
                    }
                }
            }
        }
    }
}

// Time left until the next redraw; starts a new tick once the current one is over
fn next_poll_timeout(last_tick: &mut Instant, tick_rate: Duration) -> Duration {
    if last_tick.elapsed() >= tick_rate {
        *last_tick = Instant::now();
    }
    tick_rate.saturating_sub(last_tick.elapsed())
}

// Draws the whole user interface
fn draw_ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(f.size());

    let today = Local::now().format("%A, %B %-d, %Y").to_string();
    let header = Paragraph::new(today)
        .block(Block::default().borders(Borders::ALL).title("Checklist"))
        .style(Style::new().white());
    f.render_widget(header, rows[0]);

    // Create two chunks of screen in 60-40 ratio
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    // DRAW LEFT PART
    let task_list = List::new(get_list_items_ui(app.items.items.as_slice()))
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(task_list, chunks[0], &mut app.items.state);

    // DRAW RIGHT PART
    if app.input.active {
        let new_task = Paragraph::new(get_task_input_ui(&app.input))
            .block(Block::new().title("Add Task").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(new_task, chunks[1]);
    } else {
        let right_side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let instructions = Paragraph::new(get_instructions_ui())
            .block(Block::new().title("Commands").borders(Borders::ALL))
            .style(Style::new().white());

        let statistics = Paragraph::new(get_statistics_ui(&app.items))
            .block(Block::new().title("Statistics").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(instructions, right_side[0]);
        f.render_widget(statistics, right_side[1]);
    }

    if let Some(message) = &app.notification {
        let area = centered(f.size(), 50, 30);
        let popup = Paragraph::new(message.as_str())
            .wrap(Wrap { trim: true })
            .block(
                Block::new()
                    .title("Notice - press any key")
                    .borders(Borders::ALL),
            )
            .style(Style::new().white().on_red());
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

// A rectangle of the given percentage size in the middle of `area`
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
