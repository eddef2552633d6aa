use derivative::Derivative;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

// State of the "new task" input line.
// The cursor counts chars, not bytes.
#[derive(Derivative)]
#[derivative(Default)]
pub struct TaskInputState {
    pub active: bool,
    content: String,
    cursor: usize,
    #[derivative(Default(value = "\"What needs to be done?\".to_string()"))]
    placeholder: String,
}

impl TaskInputState {
    // Opens the input with an empty line
    pub fn open(&mut self) {
        self.active = true;
        self.content.clear();
        self.cursor = 0;
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    // Insert a char at the cursor and step past it
    pub fn input(&mut self, to_insert: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, to_insert);
        self.cursor += 1;
    }

    // Delete the char before the cursor
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.content.remove(at);
        self.cursor -= 1;
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.content.chars().count());
    }

    // The text to submit. Whitespace-only input is refused.
    pub fn submission(&self) -> Option<String> {
        let text = self.content.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

// Returns the UI content for the input box
pub fn get_task_input_ui(state: &TaskInputState) -> Vec<Line<'_>> {
    const GRAY_TEXT: Style = Style::new().fg(Color::Rgb(62, 62, 62));
    const WHITE_TEXT: Style = Style::new().fg(Color::White);
    const BLACK_ON_WHITE: Style = Style::new().fg(Color::Black).bg(Color::White);

    let mut spans = vec![Span::styled("> ", WHITE_TEXT)];

    if state.content.is_empty() {
        // First placeholder char is highlighted as the cursor, the rest is gray
        spans.push(Span::styled(
            state.placeholder.chars().take(1).collect::<String>(),
            BLACK_ON_WHITE,
        ));
        spans.push(Span::styled(
            state.placeholder.chars().skip(1).collect::<String>(),
            GRAY_TEXT,
        ));
    } else {
        spans.push(Span::styled(
            state.content.chars().take(state.cursor).collect::<String>(),
            WHITE_TEXT,
        ));
        let under_cursor = state
            .content
            .chars()
            .nth(state.cursor)
            .map(String::from)
            .unwrap_or_else(|| " ".to_string());
        spans.push(Span::styled(under_cursor, BLACK_ON_WHITE));
        spans.push(Span::styled(
            state.content.chars().skip(state.cursor + 1).collect::<String>(),
            WHITE_TEXT,
        ));
    }

    vec![
        Line::from(spans),
        Line::raw(""),
        Line::from(Span::styled("Enter - save, Esc - cancel", WHITE_TEXT)),
    ]
}
