use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Job, ListView, StatusMessage};
use crate::models::{SummaryRecord, SummaryStatus};
use crate::tui::InputMode;

pub fn draw(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Link input
            Constraint::Min(0),    // Summary + saved list
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    // Left: current summary, right: saved summaries
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(rows[2]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(main_chunks[1]);

    render_header(frame, app, rows[0]);
    render_link_input(frame, app, rows[1]);
    render_summary(frame, app, main_chunks[0]);
    render_record_list(frame, app, right_chunks[0]);
    render_record_detail(frame, app, right_chunks[1]);
    render_status(frame, app, rows[3]);

    if app.input_mode == InputMode::ConfirmSave {
        render_save_prompt(frame, app);
    }

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let stats = format!(
        " {} saved summaries | showing latest {} (+/-)",
        app.saved_count, app.browse_limit
    );

    let block = Block::default()
        .title(" Podcast Summarizer ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(stats).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_link_input(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.input_mode == InputMode::Link;
    let border = if active { Color::Yellow } else { Color::DarkGray };

    let text = if active {
        format!("> {}_", app.link_input)
    } else if app.link_input.is_empty() {
        "Press l to paste a video link".to_string()
    } else {
        app.link_input.clone()
    };

    let preview = if app.link_is_invalid() {
        Line::from(Span::styled(
            " Please enter a valid YouTube video link ",
            Style::default().fg(Color::Red),
        ))
    } else {
        match app.thumbnail() {
            Some(url) => Line::from(Span::styled(
                format!(" Preview: {url} (t) "),
                Style::default().fg(Color::Blue),
            )),
            None => Line::default(),
        }
    };

    let block = Block::default()
        .title(" Video link ")
        .title_bottom(preview)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let lines: Vec<Line> = match (app.summary_status, app.session.current()) {
        (SummaryStatus::Generating, _) => vec![Line::from(format!(
            "{} Extracting transcript and summarizing...",
            app.spinner()
        ))],
        (SummaryStatus::NoApiKey, _) => vec![
            Line::from("Gemini API key not configured."),
            Line::from(""),
            Line::from("Set GOOGLE_API_KEY or add it to:"),
            Line::from("~/.config/podsum/config.toml"),
            Line::from(""),
            Line::from("Example:"),
            Line::from("gemini_api_key = \"AIza...\""),
        ],
        (SummaryStatus::Failed, _) => {
            vec![Line::from("Failed to generate summary. Press Enter to retry.")]
        }
        (_, Some(current)) => {
            let saved = if current.saved { "saved" } else { "not saved (s)" };
            let mut lines = vec![
                Line::from(Span::styled(
                    current.generated.headline.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("{} | {}", current.link, saved),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(""),
            ];
            lines.extend(current.generated.summary.lines().map(|l| Line::from(l.to_string())));
            lines
        }
        (_, None) => vec![Line::from("Press Enter to summarize the pasted link...")],
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_record_list(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.list_view {
        ListView::Search if app.input_mode == InputMode::Search => {
            format!(" Search: {}_ ", app.search_input)
        }
        ListView::Search => format!(" Search: {} ({} found) ", app.search_input, app.records.len()),
        ListView::Latest if app.input_mode == InputMode::Search => " Search: _ ".to_string(),
        ListView::Latest => format!(" Latest {} saved ", app.browse_limit),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    if app.records.is_empty() {
        let empty = match app.list_view {
            ListView::Latest => "No saved summaries found.",
            ListView::Search => "No summaries found matching your search.",
        };
        let paragraph = Paragraph::new(empty)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    // Room for the preview line inside borders and highlight symbol
    let preview_width = usize::from(area.width.saturating_sub(6)).max(10);

    let items: Vec<ListItem> = app
        .records
        .iter()
        .map(|record| {
            let preview = textwrap::wrap(&record.summary, preview_width)
                .into_iter()
                .next()
                .map(|l| l.into_owned())
                .unwrap_or_default();

            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} ", format_timestamp(record)),
                        Style::default().fg(Color::Blue),
                    ),
                    Span::styled(record.headline.clone(), Style::default().fg(Color::White)),
                ]),
                Line::from(Span::styled(
                    format!("  {preview}"),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_index));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_record_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Saved summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let lines: Vec<Line> = match app.selected_record() {
        Some(record) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    record.headline.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("{} (o to open)", record.source_link),
                    Style::default().fg(Color::Blue),
                )),
                Line::from(Span::styled(
                    format!("Timestamp: {}", format_timestamp(record)),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(""),
            ];
            lines.extend(record.summary.lines().map(|l| Line::from(l.to_string())));
            lines
        }
        None => vec![],
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, color) = match (app.pending_job, &app.status) {
        (Some(Job::Summary), _) => (
            format!("{} Extracting transcript and summarizing...", app.spinner()),
            Color::Yellow,
        ),
        (Some(Job::Voice), _) => (
            format!("{} Processing audio summary...", app.spinner()),
            Color::Yellow,
        ),
        (None, Some(StatusMessage::Success(msg))) => (format!("✓ {msg}"), Color::Green),
        (None, Some(StatusMessage::Error(msg))) => (format!("✗ {msg}"), Color::Red),
        (None, Some(StatusMessage::Info(msg))) => (msg.clone(), Color::Cyan),
        (None, None) => {
            let voice = if app.has_voice() { "v:voice  p:play  " } else { "" };
            (
                format!("l:link  Enter:summarize  {voice}/:search  b:latest  ?:help  q:quit"),
                Color::DarkGray,
            )
        }
    };

    let paragraph = Paragraph::new(text).style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
}

fn render_save_prompt(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, frame.area());

    let headline = app
        .session
        .current()
        .map(|c| c.generated.headline.as_str())
        .unwrap_or_default();

    let block = Block::default()
        .title(" Save summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text = vec![
        Line::from(Span::styled(
            headline.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Do you want to save this summary to the database? (y/n)"),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 70, frame.area());

    let help_text = [
        "",
        " Summarize:",
        "   l / i    Edit video link (paste works too)",
        "   Enter    Generate summary",
        "   s        Save current summary",
        "   t        Open thumbnail preview",
        "",
        " Voice:",
        "   v        Generate voice summary",
        "   p        Play voice summary again",
        "   x        Stop playback",
        "",
        " Saved summaries:",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   /        Search by headline",
        "   b        Show latest",
        "   + / -    Show more / fewer",
        "   o        Open video link",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn format_timestamp(record: &SummaryRecord) -> String {
    record
        .created_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
