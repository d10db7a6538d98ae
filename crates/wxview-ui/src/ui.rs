use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};
use wxview_weather::{AirQualityResult, WeatherCondition, WeatherResult};

use crate::app::App;

const TITLE: &str = "Weather App";
const PLACEHOLDER: &str = "Enter city name";
const NOT_AVAILABLE: &str = "N/A";
const MICROGRAMS: &str = "μg/m³";

/// Integral values print without a fractional part: 42.0 -> "42", 12.5 -> "12.5".
pub fn format_measure(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn icon_glyph(weather: &WeatherResult) -> &'static str {
    match weather.condition_kind() {
        WeatherCondition::Clear if !weather.is_daytime() => "☾",
        kind => kind.glyph(),
    }
}

/// Text lines of the weather card, top to bottom.
pub fn weather_card_lines(weather: &WeatherResult) -> Vec<String> {
    vec![
        format!("{}, {}", weather.name, weather.country),
        format!("{}  {}", icon_glyph(weather), weather.description),
        format!("{}°C", weather.rounded_temperature()),
        weather.condition.clone(),
        format!("Humidity: {}%", format_measure(weather.humidity)),
        format!("Wind: {} m/s", weather.rounded_wind_speed()),
    ]
}

fn pollutant_line(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}: {} {}", label, format_measure(v), MICROGRAMS),
        None => format!("{}: {}", label, NOT_AVAILABLE),
    }
}

/// Text lines of the air-quality panel, top to bottom.
pub fn air_quality_lines(aq: &AirQualityResult) -> Vec<String> {
    let aqi = aq
        .aqi
        .map(format_measure)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    vec![
        "Air Quality Index".to_string(),
        format!("AQI: {}", aqi),
        pollutant_line("PM2.5", aq.pm25()),
        pollutant_line("PM10", aq.pm10()),
    ]
}

pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    let [title_area, search_area, status_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {} ", TITLE),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))),
        title_area,
    );

    render_search(app, frame, search_area);
    render_status(app, frame, status_area);
    render_body(app, frame, body_area);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(" Enter", Style::default().fg(Color::Yellow)),
            Span::raw(" search  "),
            Span::styled("Ctrl-U", Style::default().fg(Color::Yellow)),
            Span::raw(" clear  "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" quit"),
        ]))
        .fg(Color::DarkGray),
        footer_area,
    );
}

fn render_search(app: &App, frame: &mut Frame, area: Rect) {
    let text = &app.state.query_text;
    let line = if text.is_empty() {
        Line::from(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(text.as_str())
    };

    frame.render_widget(
        Paragraph::new(line).block(Block::bordered().title(" Search ")),
        area,
    );

    // Cursor after the typed text in display columns, clamped inside the border
    let inner = area.width.saturating_sub(2);
    let typed = u16::try_from(line_width(text)).unwrap_or(u16::MAX).min(inner);
    let x = area.x.saturating_add(1).saturating_add(typed);
    frame.set_cursor_position((x, area.y.saturating_add(1)));
}

/// Display width of `text` in terminal columns.
fn line_width(text: &str) -> usize {
    Line::from(text).width()
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(error) = &app.state.error {
        Line::from(Span::styled(
            format!(" {}", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else if app.is_busy() {
        Line::from(Span::styled(
            " Loading...",
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::default()
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_body(app: &App, frame: &mut Frame, area: Rect) {
    let Some(weather) = &app.state.weather else {
        return;
    };

    let [card_area, aq_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);

    let mut card = weather_card_lines(weather).into_iter();
    let mut lines = Vec::new();
    if let Some(heading) = card.next() {
        lines.push(Line::from(Span::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(icon) = card.next() {
        lines.push(Line::from(icon));
    }
    if let Some(temp) = card.next() {
        lines.push(Line::from(Span::styled(
            temp,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
    }
    lines.extend(card.map(Line::from));

    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" Weather ")),
        card_area,
    );

    if let Some(aq) = &app.state.air_quality {
        let lines: Vec<Line> = air_quality_lines(aq).into_iter().map(Line::from).collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().title(" Air Quality ")),
            aq_area,
        );
    }
}
