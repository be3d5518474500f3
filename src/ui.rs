use crate::codec;
use crate::operations::{self, Session};
use crate::store::Store;
use crate::task::Task;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Pending,
    Overdue,
    Completed,
}

pub const COLUMNS: [Column; 3] = [Column::Pending, Column::Overdue, Column::Completed];

impl Column {
    pub fn title(self) -> &'static str {
        match self {
            Column::Pending => "PENDING",
            Column::Overdue => "OVERDUE",
            Column::Completed => "COMPLETED",
        }
    }

    pub fn holds(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            Column::Pending => !task.completed && !task.is_overdue(today),
            Column::Overdue => task.is_overdue(today),
            Column::Completed => task.completed,
        }
    }
}

/// Selection state for the full-screen task board.
pub struct Board<'a> {
    store: &'a mut Store,
    session: &'a Session,
    today: NaiveDate,
    pub selected_column: usize,
    pub selected_task: usize,
    pub status: String,
}

impl<'a> Board<'a> {
    pub fn new(store: &'a mut Store, session: &'a Session, today: NaiveDate) -> Self {
        Self {
            store,
            session,
            today,
            selected_column: 0,
            selected_task: 0,
            status: format!("Logged in as {}", session.username),
        }
    }

    pub fn column(&self) -> Column {
        COLUMNS[self.selected_column]
    }

    /// Tasks shown in `column`, with their store positions.
    pub fn tasks_in(&self, column: Column) -> Vec<(usize, &Task)> {
        self.store
            .positioned_tasks()
            .filter(|(_, t)| column.holds(t, self.today))
            .collect()
    }

    /// Returns false when the board should close.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.selected_task = 0;
                }
            }
            KeyCode::Right => {
                if self.selected_column < COLUMNS.len() - 1 {
                    self.selected_column += 1;
                    self.selected_task = 0;
                }
            }
            KeyCode::Up => {
                if self.selected_task > 0 {
                    self.selected_task -= 1;
                }
            }
            KeyCode::Down => {
                let max_tasks = self.tasks_in(self.column()).len();
                if self.selected_task + 1 < max_tasks {
                    self.selected_task += 1;
                }
            }
            KeyCode::Enter => self.complete_selected(),
            _ => {}
        }
        true
    }

    fn complete_selected(&mut self) {
        if self.column() == Column::Completed {
            self.status = "Task is already complete".to_string();
            return;
        }
        let Some((index, title, assigned_user)) = self
            .tasks_in(self.column())
            .get(self.selected_task)
            .map(|(index, t)| (*index, t.title.clone(), t.assigned_user.clone()))
        else {
            self.status = "No task selected".to_string();
            return;
        };
        if assigned_user != self.session.username {
            self.status = format!("'{title}' is assigned to {assigned_user}");
            return;
        }

        self.status = match operations::complete_task_at(self.store, index) {
            Ok(()) => format!("Marked '{title}' as complete"),
            Err(err) => err.to_string(),
        };
        let remaining = self.tasks_in(self.column()).len();
        self.selected_task = self.selected_task.min(remaining.saturating_sub(1));
    }
}

/// Takes over the terminal until the user leaves the board.
pub fn show_board(store: &mut Store, session: &Session, today: NaiveDate) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut board = Board::new(store, session, today);
    let result = run_app(&mut terminal, &mut board);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, board: &mut Board) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, board))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !board.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}

fn draw(f: &mut Frame, board: &Board) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(rows[0]);

    for (i, column) in COLUMNS.iter().enumerate() {
        let tasks = board.tasks_in(*column);
        let items: Vec<ListItem> = tasks
            .iter()
            .map(|(_, t)| {
                let mine = t.assigned_user == board.session.username;
                ListItem::new(Line::from(vec![
                    Span::styled(
                        &t.title,
                        Style::default().fg(if mine { Color::White } else { Color::Gray }),
                    ),
                    Span::raw(format!(
                        " @{} (Due: {})",
                        t.assigned_user,
                        codec::format_date(t.due_date)
                    )),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!("{} ({})", column.title(), tasks.len()))
                    .borders(Borders::ALL)
                    .border_style(if board.selected_column == i {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    }),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        let mut state = ListState::default();
        if board.selected_column == i && !tasks.is_empty() {
            state.select(Some(board.selected_task));
        }
        f.render_stateful_widget(list, chunks[i], &mut state);
    }

    let footer = Paragraph::new(board.status.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("←/→ column  ↑/↓ task  Enter complete  q back"),
    );
    f.render_widget(footer, rows[1]);
}
