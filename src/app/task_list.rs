use chrono::{DateTime, Utc};
use now::DateTimeNow;
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::models::{Task, TaskId};

// Local copy of the server list, in display order.
// Only the list fetched at load time comes from the server; afterwards the
// order is maintained here from the create/toggle/delete events alone.
#[derive(Default)]
pub struct TaskList {
    pub state: ListState,
    pub items: Vec<Task>,
}

impl TaskList {
    // Uncompleted tasks first, server order kept inside each group
    pub fn from_server(mut tasks: Vec<Task>) -> TaskList {
        tasks.sort_by_key(|task| task.completed);
        TaskList {
            state: ListState::default(),
            items: tasks,
        }
    }

    // A freshly created task always goes to the very top
    pub fn on_created(&mut self, task: Task) {
        self.items.insert(0, task);
    }

    // Completed tasks sink to the bottom; reopened ones are placed right above
    // the first completed task. A selected task stays selected at its new place.
    pub fn on_toggled(&mut self, id: TaskId, completed: bool) {
        let Some(index) = self.position_of(id) else {
            return;
        };
        let was_selected = self.state.selected() == Some(index);
        let mut task = self.items.remove(index);
        task.completed = completed;

        let new_index = if completed {
            self.items.push(task);
            self.items.len() - 1
        } else {
            match self.items.iter().position(|task| task.completed) {
                Some(first_completed) => {
                    self.items.insert(first_completed, task);
                    first_completed
                }
                None => {
                    self.items.push(task);
                    self.items.len() - 1
                }
            }
        };
        if was_selected {
            self.state.select(Some(new_index));
        }
    }

    pub fn on_deleted(&mut self, id: TaskId) {
        self.items.retain(|task| task.id != id);
        if let Some(i) = self.state.selected() {
            if self.items.is_empty() {
                self.state.select(None);
            } else if i >= self.items.len() {
                self.state.select(Some(self.items.len() - 1));
            }
        }
    }

    fn position_of(&self, id: TaskId) -> Option<usize> {
        self.items.iter().position(|task| task.id == id)
    }

    // Move the selection to the next item
    pub fn next(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() || i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    // Move the selection to the previous item
    pub fn previous(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() {
                    0
                } else if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn unselect(&mut self) {
        self.state.select(None);
    }

    // Get the selected task
    pub fn get_selected(&self) -> Option<&Task> {
        match self.state.selected() {
            Some(i) => self.items.get(i),
            None => None,
        }
    }

    pub fn get_uncompleted(&self) -> Vec<&Task> {
        self.items.iter().filter(|task| !task.completed).collect()
    }

    pub fn get_completed(&self) -> Vec<&Task> {
        self.items.iter().filter(|task| task.completed).collect()
    }

    // Ids are creation timestamps, so they tell when a task was added
    pub fn get_added_since(&self, since: DateTime<Utc>) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| {
                DateTime::from_timestamp_millis(task.id).is_some_and(|added| added >= since)
            })
            .collect()
    }

    pub fn get_added_today(&self) -> Vec<&Task> {
        self.get_added_since(Utc::now().beginning_of_day())
    }
}

// Build the UI (list) for task list
pub fn get_list_items_ui(tasks: &[Task]) -> Vec<ListItem<'_>> {
    tasks
        .iter()
        .map(|task| {
            let text = if task.completed {
                Span::from(task.text.as_str()).fg(Color::DarkGray).crossed_out()
            } else {
                Span::from(task.text.as_str()).fg(Color::White)
            };

            let line = Line::from(vec![
                Span::from(if task.completed { "[✓] " } else { "[ ] " }),
                text,
            ]);
            ListItem::new(line).style(Style::default().fg(Color::White))
        })
        .collect()
}

// Build the UI (lines) for statistics infobox
pub fn get_statistics_ui(items: &TaskList) -> Vec<Line<'_>> {
    vec![
        Line::from(format!("Total tasks: {}", items.items.len())),
        Line::from(format!("Remaining: {}", items.get_uncompleted().len())),
        Line::from(format!("Completed: {}", items.get_completed().len())),
        Line::from(format!("Added today: {}", items.get_added_today().len())),
    ]
}

// Build the UI (lines) for instructions infobox
pub fn get_instructions_ui<'a>() -> Vec<Line<'a>> {
    vec![
        "Enter - toggle do/done".into(),
        "a - add a task".into(),
        "x - delete a task".into(),
        "r - reload from server".into(),
        "q - quit".into(),
    ]
}
