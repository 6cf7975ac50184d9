use super::app::{Dashboard, Focus};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
};
use taxwatch::core::{CrawlStatus, Priority};
use taxwatch::{FeedDisplay, Pagination, QueryState};

pub fn draw(f: &mut Frame, dash: &Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(4), // Stat cards
            Constraint::Min(8),    // Feeds
            Constraint::Length(8), // Crawl history
            Constraint::Length(1), // Notice / help
        ])
        .split(f.area());

    draw_title(f, chunks[0], dash);
    draw_cards(f, chunks[1], dash);

    let feeds = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    let analyses: Vec<ListItem> = dash
        .analyses
        .items()
        .iter()
        .map(|a| {
            let kind = if a.old_document.is_some() {
                Span::styled("REV ", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("NEW ", Style::default().fg(Color::Green))
            };
            ListItem::new(Line::from(vec![
                kind,
                Span::styled(
                    format!("{} ", a.new_document.document_number),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(a.new_document.title.clone()),
                Span::styled(
                    format!("  {} changes, {} high", a.total_changes, a.high_priority_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    draw_feed(
        f,
        feeds[0],
        "Document analyses",
        dash.focus == Focus::Analyses,
        &dash.analyses,
        analyses,
        "No analyses for this week",
    );

    let news: Vec<ListItem> = dash
        .news
        .items()
        .iter()
        .map(|n| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<6} ", n.priority), priority_style(n.priority)),
                Span::raw(n.title.clone()),
                Span::styled(
                    format!("  {}", n.source_name),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let news_title = match dash.priority {
        Some(priority) => format!("News [{}]", priority),
        None => "News".to_string(),
    };
    draw_feed(
        f,
        feeds[1],
        &news_title,
        dash.focus == Focus::News,
        &dash.news,
        news,
        "No news",
    );

    draw_history(f, chunks[3], &dash.history);
    draw_footer(f, chunks[4], dash);
}

fn draw_title(f: &mut Frame, area: Rect, dash: &Dashboard) {
    let week = match dash.week {
        Some(week) => week.to_string(),
        None => "current week".to_string(),
    };
    let title = Line::from(vec![
        Span::styled(
            " TaxWatch ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} ", week)),
    ]);
    f.render_widget(Paragraph::new(title), area);
}

fn draw_cards(f: &mut Frame, area: Rect, dash: &Dashboard) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let documents = stat_lines(&dash.weekly_stats, |s| {
        vec![
            format!("{} documents", s.total_documents),
            format!("{} new, {} revised", s.new_documents, s.revised_documents),
        ]
    });
    let changes = stat_lines(&dash.weekly_stats, |s| {
        vec![
            format!("{} changes", s.total_changes),
            format!("{} high priority", s.high_priority_changes),
        ]
    });
    let posting = stat_lines(&dash.news_stats, |s| {
        vec![
            format!("{} posted today", s.posted_today),
            format!("{} slots left", s.remaining_slots),
        ]
    });
    let last_crawl = stat_lines(&dash.history, |history| match history.first() {
        Some(log) => vec![
            log.status.to_string(),
            log.started_at.format("%Y-%m-%d %H:%M").to_string(),
        ],
        None => vec!["No crawls yet".to_string()],
    });

    for (i, (title, lines)) in [
        ("Documents", documents),
        ("Changes", changes),
        ("Posting", posting),
        ("Last crawl", last_crawl),
    ]
    .into_iter()
    .enumerate()
    {
        let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
        let card = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
        f.render_widget(card, cards[i]);
    }
}

/// Lines for one stat card; cached data wins over loading and error states.
fn stat_lines<T>(state: &QueryState<T>, render: impl FnOnce(&T) -> Vec<String>) -> Vec<String> {
    match (&state.data, &state.error) {
        (Some(data), _) => render(data.as_ref()),
        (None, Some(_)) => vec!["unavailable".to_string()],
        (None, None) => vec!["loading...".to_string()],
    }
}

fn draw_feed<T>(
    f: &mut Frame,
    area: Rect,
    title: &str,
    focused: bool,
    display: &FeedDisplay<T>,
    items: Vec<ListItem>,
    empty_text: &str,
) {
    let mut title_spans = vec![Span::raw(format!(" {} ", title))];
    if display.is_fetching && display.page.is_some() {
        title_spans.push(Span::styled(
            "(updating) ",
            Style::default().fg(Color::DarkGray),
        ));
    }
    if display.error.is_some() && display.page.is_some() {
        title_spans.push(Span::styled(
            "(refresh failed) ",
            Style::default().fg(Color::Red),
        ));
    }

    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Line::from(title_spans));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    if display.page.is_none() {
        let text = match &display.error {
            Some(err) => Line::styled(
                format!("Failed to load: {}", err),
                Style::default().fg(Color::Red),
            ),
            None => Line::styled("Loading...", Style::default().fg(Color::DarkGray)),
        };
        f.render_widget(Paragraph::new(text), parts[0]);
        return;
    }
    if display.is_empty_state() {
        f.render_widget(
            Paragraph::new(Line::styled(empty_text, Style::default().fg(Color::DarkGray))),
            parts[0],
        );
        return;
    }

    f.render_widget(List::new(items), parts[0]);
    if let Some(pagination) = &display.pagination {
        f.render_widget(Paragraph::new(pagination_line(pagination)), parts[1]);
    }
}

/// `< Prev  1 2 [3] 4 5  Next >  Showing 11 to 15 of 23 results`
pub fn pagination_line(pagination: &Pagination) -> Line<'static> {
    let enabled = Style::default();
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = vec![Span::styled(
        "< Prev ",
        if pagination.has_prev() { enabled } else { disabled },
    )];
    for page in pagination.window() {
        if pagination.is_current(page) {
            spans.push(Span::styled(
                format!("[{}]", page),
                Style::default().add_modifier(Modifier::REVERSED),
            ));
        } else {
            spans.push(Span::raw(format!(" {} ", page)));
        }
    }
    spans.push(Span::styled(
        " Next >",
        if pagination.has_next() { enabled } else { disabled },
    ));
    spans.push(Span::styled(
        format!("  {}", pagination),
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

fn draw_history(f: &mut Frame, area: Rect, history: &QueryState<Vec<taxwatch::core::CrawlLog>>) {
    let block = Block::default().borders(Borders::ALL).title(" Crawl history ");
    let Some(logs) = &history.data else {
        let text = if history.error.is_some() {
            "Failed to load crawl history"
        } else {
            "Loading..."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let rows: Vec<Row> = logs
        .iter()
        .map(|log| {
            let duration = log
                .duration()
                .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(log.started_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::from(log.status.to_string()).style(status_style(log.status)),
                Cell::from(log.documents_found.to_string()),
                Cell::from(log.documents_saved.to_string()),
                Cell::from(duration),
                Cell::from(log.error.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(19),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["Started", "Status", "Found", "Saved", "Took", "Error"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    f.render_widget(table, area);
}

fn draw_footer(f: &mut Frame, area: Rect, dash: &Dashboard) {
    let line = match (&dash.notice, dash.running) {
        (Some(notice), _) if notice.is_error => {
            Line::styled(notice.text.clone(), Style::default().fg(Color::Red))
        }
        (_, Some(job)) => Line::styled(
            format!("{} running...", job.label()),
            Style::default().fg(Color::Yellow),
        ),
        (Some(notice), None) => {
            Line::styled(notice.text.clone(), Style::default().fg(Color::Green))
        }
        (None, None) => Line::styled(
            "Tab focus | <-/-> page | 1-9 go to | [ ] week | w this week | f priority | r reload | c crawl | n news crawl | p post | q quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Green),
    }
}

fn status_style(status: CrawlStatus) -> Style {
    match status {
        CrawlStatus::Running => Style::default().fg(Color::Yellow),
        CrawlStatus::Success => Style::default().fg(Color::Green),
        CrawlStatus::Failed => Style::default().fg(Color::Red),
    }
}
