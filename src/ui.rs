pub mod charting;

use chrono::{DateTime, Local};
use codetype::{
    codec::DecodedResult,
    game::RunResult,
    history::{time_ago, HistoryEntry},
    keystroke::Interpreter,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{ui::charting::or_dash, App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

fn visible(c: char) -> String {
    match c {
        ' ' => "·".to_owned(),
        '\n' => "↵".to_owned(),
        '\t' => "→".to_owned(),
        c => c.to_string(),
    }
}

/// The snippet split into styled lines: typed prefix, cursor or wrong
/// character, then the untyped rest.
fn snippet_lines(code: &str, interpreter: &Interpreter) -> Vec<Line<'static>> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default()
        .patch(bold_style)
        .fg(Color::White)
        .bg(Color::Red);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);

    let cursor = interpreter.typed_len();
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();

    for (idx, c) in code.chars().enumerate() {
        if idx == cursor {
            match interpreter.wrong_char() {
                Some(wrong) => spans.push(Span::styled(visible(wrong), red_bold_style)),
                None => spans.push(Span::styled(visible(c), underlined_dim_bold_style)),
            }
        } else if c != '\n' {
            let style = if idx < cursor {
                green_bold_style
            } else {
                dim_bold_style
            };
            spans.push(Span::styled(c.to_string(), style));
        }

        if c == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }
    lines.push(Line::from(spans));
    lines
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let game = &app.game;
    let prompt = game.prompt();
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let lines = snippet_lines(&prompt.code, game.interpreter());
    let snippet_height = lines.len() as u16;
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2) as usize;
    // a short one-liner sits centered; anything else keeps its indentation
    let centered = snippet_height == 1 && prompt.code.width() <= max_chars_per_line;
    let padding = area.height.saturating_sub(snippet_height + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // live stats
            Constraint::Length(1),
            Constraint::Length(snippet_height),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = if game.has_started() {
        format!(
            "{:.0} wpm   {:.0}% acc",
            game.live_wpm(app.now_ms()),
            game.live_accuracy() * 100.0
        )
    } else {
        format!(
            "{} · {} · {} line{} · {} scoring",
            prompt.language,
            prompt.difficulty,
            prompt.lines,
            if prompt.lines == 1 { "" } else { "s" },
            game.scoring_mode()
        )
    };
    Paragraph::new(Span::styled(header, bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(lines)
        .alignment(if centered {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "^r restart / ^n new / ^l lines / ^d difficulty / ^s scoring / (esc)ape",
        dim_style.add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}

fn summary_line(result: &RunResult) -> String {
    let score = result.score();
    format!(
        "{:.0} wpm   {:.1}% acc   {:.1} score{}",
        result.stats.correct_wpm,
        result.stats.accuracy * 100.0,
        score.score,
        if result.remote_settled {
            ""
        } else {
            " (provisional)"
        }
    )
}

fn detail_line(result: &RunResult) -> String {
    let stats = &result.stats;
    format!(
        "consistency {}   problem keys {}   longest pause {}   fix time {}",
        or_dash(stats.consistency, |c| format!("{c}%")),
        or_dash(
            (!stats.problem_keys.is_empty()).then_some(&stats.problem_keys),
            |keys| keys.iter().map(|&c| visible(c)).collect::<Vec<_>>().join(" ")
        ),
        or_dash(stats.longest_pause_ms, |ms| format!("{ms}ms")),
        or_dash(stats.avg_correction_latency_ms, |ms| format!("{ms:.0}ms")),
    )
}

fn render_results(result: &RunResult, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // detail stats
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let (overall_duration, highest_wpm) = charting::compute_chart_params(&result.wpm_series);
    let tuples: Vec<(f64, f64)> = result
        .wpm_series
        .iter()
        .map(|&p| <(f64, f64)>::from(p))
        .collect();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&tuples)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(overall_duration), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        );
    chart.render(chunks[0], buf);

    Paragraph::new(Span::styled(summary_line(result), bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        detail_line(result),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (l)ines / (d)iff / (s)coring / (h)istory / (esc)",
        italic_style,
    ))
    .render(chunks[4], buf);
}

fn history_row(entry: &HistoryEntry, decoded: &DecodedResult, now: DateTime<Local>) -> String {
    let difficulty = decoded.prompt.difficulty.to_string();
    let mut label = difficulty.chars();
    let difficulty = label
        .next()
        .map(|first| first.to_uppercase().chain(label).collect::<String>())
        .unwrap_or_default();

    format!(
        "{:>4} wpm  {:>4.0}% acc  {:<8} {}L  {:>9.1} pts  {:>9}",
        decoded.stats.correct_wpm.round(),
        decoded.stats.accuracy * 100.0,
        difficulty,
        decoded.prompt.lines,
        decoded.score.score,
        time_ago(entry.timestamp, now),
    )
}

fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let selected_style = Style::default().fg(Color::Black).bg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Min(1),    // entries
            Constraint::Length(1), // count
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("Recent Results", bold_style))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let decoded = app.decoded_history();
    if decoded.is_empty() {
        Paragraph::new(vec![
            Line::from(Span::styled("No recent results", bold_style)),
            Line::from(Span::styled("Complete a game to see it here", dim_style)),
        ])
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    } else {
        let now = Local::now();
        // keep the selected row on screen
        let visible_rows = chunks[1].height.max(1) as usize;
        let skip = (app.history_cursor + 1).saturating_sub(visible_rows);
        let rows: Vec<Line> = decoded
            .iter()
            .enumerate()
            .skip(skip)
            .take(visible_rows)
            .map(|(idx, (entry, result))| {
                let style = if idx == app.history_cursor {
                    selected_style
                } else {
                    Style::default()
                };
                Line::from(Span::styled(history_row(entry, result, now), style))
            })
            .collect();
        Paragraph::new(rows)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        Paragraph::new(Span::styled(
            format!(
                "Session history · {} result{}",
                decoded.len(),
                if decoded.len() == 1 { "" } else { "s" }
            ),
            dim_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    Paragraph::new(Span::styled(
        "(j/k) select / (x) delete / (c)lear / (h|esc) back",
        italic_style,
    ))
    .render(chunks[3], buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.state, self.game.result()) {
            (AppState::History, _) => render_history(self, area, buf),
            (AppState::Results, Some(result)) => render_results(result, area, buf),
            _ => render_typing(self, area, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetype::{
        config::Config,
        prompts::{FixedTarget, Prompt},
        runtime::ManualClock,
        score::Difficulty,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn create_test_app(code: &str, finished: bool) -> App {
        let clock = ManualClock::new(0);
        let mut app = App::new(
            Config::default(),
            Box::new(FixedTarget(Prompt::custom(code.to_string(), Difficulty::Easy))),
            Box::new(clock.clone()),
        );
        if finished {
            for c in code.chars() {
                clock.advance(150);
                let key_code = if c == '\n' { KeyCode::Enter } else { KeyCode::Char(c) };
                app.on_typing_key(&KeyEvent::new(key_code, KeyModifiers::NONE));
            }
        }
        app
    }

    fn render(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_ui_widget_in_progress() {
        let app = create_test_app("let x = 1;", false);
        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("let·x·=·1;") || rendered.contains("let x = 1;"));
        assert!(rendered.contains("easy"));
    }

    #[test]
    fn test_ui_widget_shows_wrong_char() {
        let mut app = create_test_app("ab", false);
        app.on_typing_key(&KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        app.on_typing_key(&KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE));

        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);

        let wrong = buffer
            .content()
            .iter()
            .find(|c| c.symbol() == "z")
            .expect("wrong char rendered");
        assert_eq!(wrong.bg, Color::Red);
        assert!(!buffer.content().iter().any(|c| c.symbol() == "b"));
    }

    #[test]
    fn test_snippet_lines_split_on_newline() {
        let mut interpreter = Interpreter::new("a\nb");
        let lines = snippet_lines("a\nb", &interpreter);
        assert_eq!(lines.len(), 2);

        interpreter.handle_key(&KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE), 1);
        let lines = snippet_lines("a\nb", &interpreter);
        // the pending newline is drawn as a marker at the end of line one
        assert_eq!(lines[0].spans.last().map(|s| s.content.as_ref()), Some("↵"));
    }

    #[test]
    fn test_ui_widget_finished() {
        let app = create_test_app("hello", true);
        assert_eq!(app.state, AppState::Results);

        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("wpm"));
        assert!(rendered.contains("100.0% acc"));
        assert!(rendered.contains("(provisional)"));
        assert!(rendered.contains("(r)etry"));
    }

    #[test]
    fn test_detail_line_placeholders() {
        let app = create_test_app("a", true);
        let result = app.game.result().unwrap();
        // one keystroke: no rhythm, no pauses, no corrections
        assert_eq!(
            detail_line(result),
            "consistency -   problem keys -   longest pause -   fix time -"
        );
    }

    #[test]
    fn test_ui_widget_small_area() {
        let app = create_test_app("hello", false);
        let area = Rect::new(0, 0, 20, 5);
        let mut buffer = Buffer::empty(area);

        (&app).render(area, &mut buffer);

        assert!(*buffer.area() == area);
    }

    #[test]
    fn test_ui_history_view() {
        let mut app = create_test_app("hello", true);
        app.record_result();
        app.state = AppState::History;

        let rendered = render(&app, Rect::new(0, 0, 100, 24));
        assert!(rendered.contains("Recent Results"));
        assert!(rendered.contains("100% acc"));
        assert!(rendered.contains("Easy"));
        assert!(rendered.contains("1L"));
        assert!(rendered.contains("just now"));
        assert!(rendered.contains("1 result"));
    }

    #[test]
    fn test_ui_history_empty() {
        let mut app = create_test_app("hello", true);
        app.state = AppState::History;

        let rendered = render(&app, Rect::new(0, 0, 80, 24));
        assert!(rendered.contains("No recent results"));
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
    }
}
