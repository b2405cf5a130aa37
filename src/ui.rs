use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use snapshot_diff::{ComparisonReport, JobReport};
use std::io;

/// One page per comparison in the job
pub struct App {
    pub report: JobReport,
    pub current_page: usize,
    pub states: Vec<TableState>,
    pub show_detail: bool,
}

impl App {
    pub fn new(report: JobReport) -> Self {
        let states = report
            .comparisons
            .iter()
            .map(|c| {
                let mut state = TableState::default();
                if !c.result.is_empty() {
                    state.select(Some(0));
                }
                state
            })
            .collect();

        Self {
            report,
            current_page: 0,
            states,
            show_detail: false,
        }
    }

    pub fn page(&self) -> Option<&ComparisonReport> {
        self.report.comparisons.get(self.current_page)
    }

    fn page_len(&self) -> usize {
        self.page().map(|c| c.result.len()).unwrap_or(0)
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        let pages = self.report.comparisons.len();
        if pages > 0 {
            self.current_page = (self.current_page + 1) % pages;
        }
    }

    pub fn previous_page(&mut self) {
        let pages = self.report.comparisons.len();
        if pages > 0 {
            self.current_page = (self.current_page + pages - 1) % pages;
        }
    }

    fn select(&mut self, index: Option<usize>) {
        if let Some(state) = self.states.get_mut(self.current_page) {
            state.select(index);
        }
    }

    fn selected(&self) -> Option<usize> {
        self.states.get(self.current_page).and_then(|s| s.selected())
    }

    pub fn next(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let i = match self.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let i = match self.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let i = self.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        self.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.page_len() == 0 {
            return;
        }
        let i = self.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.select(Some(i));
    }

    pub fn home(&mut self) {
        if self.page_len() > 0 {
            self.select(Some(0));
        }
    }

    pub fn end(&mut self) {
        let len = self.page_len();
        if len > 0 {
            self.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "viewer exited with error");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.home(),
                KeyCode::End => app.end(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with comparison tabs
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let has_rows = app.page_len() > 0;
    if app.show_detail && has_rows {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else if has_rows {
        render_table(f, chunks[1], app);
    } else {
        render_empty(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, comparison) in app.report.comparisons.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if i == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(
            format!("{} ({})", comparison.title, comparison.result.len()),
            style,
        ));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Key: {}", app.report.key_column),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(comparison) = app.report.comparisons.get(app.current_page) else {
        return;
    };
    let result = &comparison.result;
    let columns = result.columns();
    let tracked = result.tracked_fields().len();
    let first_old = 1 + result.passthrough_fields().len();

    let header_cells = columns.iter().map(|h| {
        Cell::from(h.clone()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = result
        .records()
        .iter()
        .zip(result.rows())
        .map(|(record, row)| {
            let changed: Vec<usize> = record.changed_indices().collect();
            let cells = row.iter().enumerate().map(|(i, value)| {
                let style = match i.checked_sub(first_old) {
                    Some(j) if j < tracked && changed.contains(&j) => Style::default().fg(Color::Red),
                    Some(j) if j >= tracked && j < 2 * tracked && changed.contains(&(j - tracked)) => {
                        Style::default().fg(Color::Green)
                    }
                    _ => Style::default(),
                };
                Cell::from(truncate(&value.to_string(), 30)).style(style)
            });
            Row::new(cells).height(1)
        })
        .collect();

    let widths: Vec<Constraint> = columns
        .iter()
        .map(|c| Constraint::Min(c.chars().count().clamp(6, 24) as u16))
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", comparison.title)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    if let Some(state) = app.states.get_mut(app.current_page) {
        f.render_stateful_widget(table, area, state);
    }
}

fn render_empty(f: &mut Frame, area: Rect, app: &App) {
    let (title, message) = match app.page() {
        Some(c) => (c.title.clone(), c.empty_message.clone()),
        None => ("Report".to_string(), "No comparisons configured.".to_string()),
    };

    let paragraph = Paragraph::new(Line::from(Span::styled(
        message,
        Style::default().fg(Color::Green),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {title} ")),
    );

    f.render_widget(paragraph, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(comparison) = app.page() else {
        return;
    };
    let Some(index) = app.selected() else {
        return;
    };

    let columns = comparison.result.columns();
    let rows = comparison.result.rows();
    let Some(row) = rows.get(index) else {
        return;
    };

    let lines: Vec<Line> = columns
        .iter()
        .zip(row)
        .map(|(column, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{column}: "),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw(value.to_string()),
            ])
        })
        .collect();

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Details "),
        );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.page_len();

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Comparison | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_diff::{run_job, Dataset, JobConfig};

    fn sample_app() -> App {
        let columns = ["Request ID", "Delivery Date", "Request Status"];
        let old = Dataset::from_rows(
            &columns,
            vec![
                vec![1.into(), "a".into(), "open".into()],
                vec![2.into(), "b".into(), "open".into()],
            ],
        )
        .unwrap();
        let new = Dataset::from_rows(
            &columns,
            vec![
                vec![1.into(), "a2".into(), "open".into()],
                vec![2.into(), "b2".into(), "open".into()],
            ],
        )
        .unwrap();
        App::new(run_job(&JobConfig::default(), &old, &new).unwrap())
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = sample_app();
        assert_eq!(app.selected(), Some(0));
        app.next();
        assert_eq!(app.selected(), Some(1));
        app.next();
        assert_eq!(app.selected(), Some(0));
        app.previous();
        assert_eq!(app.selected(), Some(1));
    }

    #[test]
    fn test_empty_page_has_no_selection() {
        let mut app = sample_app();
        app.next_page();
        assert_eq!(app.page().unwrap().name, "request_status");
        assert_eq!(app.selected(), None);
        app.next();
        assert_eq!(app.selected(), None);
        app.next_page();
        assert_eq!(app.current_page, 0);
        app.previous_page();
        assert_eq!(app.current_page, 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Shipped to Location", 10), "Shipped...");
    }
}
