use once_cell::sync::Lazy;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("valid URL pattern"));

/// Strip control characters so backend text cannot smuggle terminal escape
/// sequences into the transcript. Newlines and tabs survive.
pub fn sanitize(content: &str) -> String {
    content
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Render message content into styled lines: one `Line` per text line, with
/// bare URLs highlighted and `**bold**` markers applied best-effort.
pub fn content_lines(content: &str) -> Vec<Line<'static>> {
    sanitize(content).lines().map(styled_line).collect()
}

fn styled_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut last = 0;

    for m in URL_RE.find_iter(text) {
        if m.start() > last {
            push_marked_spans(&mut spans, &text[last..m.start()]);
        }
        spans.push(Span::styled(
            m.as_str().to_string(),
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        ));
        last = m.end();
    }

    if last < text.len() {
        push_marked_spans(&mut spans, &text[last..]);
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Convert `**bold**` markers to bold spans. Single `*` and unterminated
/// markers stay literal.
fn push_marked_spans(spans: &mut Vec<Span<'static>>, text: &str) {
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_plain_text_is_one_raw_span() {
        let lines = content_lines("just some text");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(lines[0].spans[0].content, "just some text");
    }

    #[test]
    fn test_bold_marker_becomes_bold_span() {
        let lines = content_lines("an **important** word");
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].content, "important");
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unterminated_bold_stays_literal() {
        let lines = content_lines("a **dangling marker");
        assert_eq!(line_text(&lines[0]), "a **dangling marker");
    }

    #[test]
    fn test_single_star_stays_literal() {
        let lines = content_lines("2 * 3 = 6");
        assert_eq!(line_text(&lines[0]), "2 * 3 = 6");
    }

    #[test]
    fn test_url_gets_underlined_span() {
        let lines = content_lines("see https://docs.ceph.com/en/latest for details");
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].content, "https://docs.ceph.com/en/latest");
        assert!(spans[1].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_script_tag_renders_as_literal_text() {
        let lines = content_lines("<script>alert(1)</script>");
        assert_eq!(line_text(&lines[0]), "<script>alert(1)</script>");
    }

    #[test]
    fn test_escape_sequences_are_stripped() {
        assert_eq!(sanitize("\x1b[31mred\x1b[0m"), "[31mred[0m");
        assert_eq!(sanitize("tab\there\nnext"), "tab\there\nnext");
    }

    #[test]
    fn test_newlines_split_into_lines() {
        let lines = content_lines("first\n\nthird");
        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[0]), "first");
        assert!(lines[1].spans.is_empty());
        assert_eq!(line_text(&lines[2]), "third");
    }
}
