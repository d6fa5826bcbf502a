use super::*;

/// Draws the search line, the entity list, an optional notice and the footer.
///
/// The list gets every line the other parts leave over and scrolls so the
/// selected row stays visible.
pub fn render_console(area: Rect, frame: &mut ratatui::Frame<'_>, view: &ConsoleView<'_>) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let notice_height = u16::from(view.notice.is_some());
    let list_height = area.height.saturating_sub(4 + notice_height);

    render_search(line_at(area, 0), frame, view.query);
    if list_height > 0 {
        let list_area = Rect {
            x: area.x,
            y: area.y + 2,
            width: area.width,
            height: list_height,
        };
        render_list(list_area, frame, view);
    }
    if let Some(notice) = view.notice {
        if area.height >= 5 {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                notice.to_string(),
                Style::default().fg(COLOR_RED),
            )));
            frame.render_widget(paragraph, line_at(area, area.height - 3));
        }
    }
    if area.height >= 2 {
        let footer = Paragraph::new(Line::from(Span::styled(FOOTER, info_style())));
        frame.render_widget(footer, line_at(area, area.height - 1));
    }
}

fn line_at(area: Rect, offset: u16) -> Rect {
    Rect {
        x: area.x,
        y: area.y + offset,
        width: area.width,
        height: 1,
    }
}

fn render_search(area: Rect, frame: &mut ratatui::Frame<'_>, query: &str) {
    let mut spans = vec![Span::styled("> ", marker_style())];
    if query.is_empty() {
        spans.push(Span::styled(
            SEARCH_PLACEHOLDER,
            info_style().add_modifier(Modifier::DIM),
        ));
    } else {
        spans.push(Span::raw(query.to_string()));
    }
    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(COLOR_PROMPT_BG));
    frame.render_widget(paragraph, area);

    let typed = u16::try_from(query.chars().count()).unwrap_or(u16::MAX);
    let cursor_x = area
        .x
        .saturating_add(2)
        .saturating_add(typed)
        .min(area.x + area.width.saturating_sub(1));
    frame.set_cursor(cursor_x, area.y);
}

fn render_list(area: Rect, frame: &mut ratatui::Frame<'_>, view: &ConsoleView<'_>) {
    let height = usize::from(area.height);
    let offset = scroll_offset(view.cursor, height);
    let lines = view
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, row)| {
            let selected = view.cursor == Some(index);
            let marker = if selected {
                Span::styled(">", marker_style())
            } else {
                Span::raw(" ")
            };
            let mut spans = vec![marker];
            spans.extend(row.render().spans);
            let mut line = Line::from(spans);
            if selected {
                line.style = Style::default().add_modifier(Modifier::BOLD);
            }
            line
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines), area);
}

/// First row to draw so that `cursor` lands inside a window of `height` rows.
fn scroll_offset(cursor: Option<usize>, height: usize) -> usize {
    match cursor {
        Some(cursor) if height > 0 && cursor >= height => cursor + 1 - height,
        _ => 0,
    }
}
