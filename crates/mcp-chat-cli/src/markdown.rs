//! Markdown to ratatui text conversion.
//!
//! Assistant entries are rendered as markdown; fenced code blocks and tool
//! payloads are syntax highlighted with syntect. The syntax and theme sets
//! are loaded once per process.

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const THEME: &str = "base16-ocean.dark";
const GUTTER: Style = Style::new().fg(Color::DarkGray);

/// Render markdown into styled lines that fit `width` columns.
///
/// Code lines wider than `width` are truncated rather than wrapped.
pub fn render_markdown(text: &str, width: usize) -> Vec<Line<'static>> {
    MarkdownRenderer::new(width).render(text)
}

/// Render a standalone code block, as used for tool arguments and output.
pub fn render_code(code: &str, lang: &str, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    push_code_block(&mut lines, code, lang, width);
    lines
}

// =============================================================================
// Highlighting
// =============================================================================

struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

fn highlighter() -> &'static Highlighter {
    static HIGHLIGHTER: OnceLock<Highlighter> = OnceLock::new();
    HIGHLIGHTER.get_or_init(|| {
        let mut themes = ThemeSet::load_defaults();
        Highlighter {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme: themes.themes.remove(THEME).unwrap_or_default(),
        }
    })
}

impl Highlighter {
    /// Highlight `code`, one span list per source line.
    fn highlight(&self, code: &str, lang: &str) -> Vec<Vec<Span<'static>>> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut lines = HighlightLines::new(syntax, &self.theme);

        LinesWithEndings::from(code)
            .map(|line| match lines.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => ranges
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches(['\n', '\r']);
                        (!text.is_empty()).then(|| Span::styled(text.to_string(), to_ratatui(style)))
                    })
                    .collect(),
                Err(_) => vec![Span::styled(
                    line.trim_end_matches(['\n', '\r']).to_string(),
                    Style::default().fg(Color::Yellow),
                )],
            })
            .collect()
    }
}

fn to_ratatui(style: syntect::highlighting::Style) -> Style {
    let fg = style.foreground;
    let mut out = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
    for (font, modifier) in [
        (FontStyle::BOLD, Modifier::BOLD),
        (FontStyle::ITALIC, Modifier::ITALIC),
        (FontStyle::UNDERLINE, Modifier::UNDERLINED),
    ] {
        if style.font_style.contains(font) {
            out = out.add_modifier(modifier);
        }
    }
    out
}

/// Append a bordered, highlighted code block to `lines`.
fn push_code_block(lines: &mut Vec<Line<'static>>, code: &str, lang: &str, width: usize) {
    let rule_len = width.saturating_sub(2).min(44);

    if lang.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("┌", GUTTER),
            Span::styled("─".repeat(rule_len), GUTTER),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::styled("┌─ ", GUTTER),
            Span::styled(
                lang.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ", GUTTER),
            Span::styled("─".repeat(rule_len.saturating_sub(lang.len() + 3)), GUTTER),
        ]));
    }

    let highlighted = highlighter().highlight(code, lang);
    let numbered = highlighted.len() > 1;
    let number_width = highlighted.len().to_string().len();
    let prefix_width = if numbered { number_width + 5 } else { 2 };
    let max_code = width.saturating_sub(prefix_width + 1);

    for (index, spans) in highlighted.into_iter().enumerate() {
        let mut line = vec![Span::styled("│ ", GUTTER)];
        if numbered {
            line.push(Span::styled(
                format!("{:>number_width$}", index + 1),
                Style::default().fg(Color::Rgb(100, 100, 100)),
            ));
            line.push(Span::styled(" │ ", GUTTER));
        }
        line.extend(truncate_spans(spans, max_code));
        lines.push(Line::from(line));
    }

    lines.push(Line::from(vec![
        Span::styled("└", GUTTER),
        Span::styled("─".repeat(rule_len), GUTTER),
    ]));
}

/// Cut `spans` to at most `max` characters, marking the cut with `…`.
fn truncate_spans(spans: Vec<Span<'static>>, max: usize) -> Vec<Span<'static>> {
    let total: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    if total <= max {
        return spans;
    }

    let mut remaining = max.saturating_sub(1);
    let mut out = Vec::new();
    for span in spans {
        if remaining == 0 {
            break;
        }
        let len = span.content.chars().count();
        if len <= remaining {
            remaining -= len;
            out.push(span);
        } else {
            let cut: String = span.content.chars().take(remaining).collect();
            out.push(Span::styled(cut, span.style));
            remaining = 0;
        }
    }
    out.push(Span::styled("…", GUTTER));
    out
}

// =============================================================================
// Markdown
// =============================================================================

struct PendingCode {
    lang: String,
    body: String,
}

struct MarkdownRenderer {
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// One entry per open list; `Some(n)` is the next ordinal.
    lists: Vec<Option<u64>>,
    code: Option<PendingCode>,
    link: Option<String>,
    quote_depth: usize,
}

impl MarkdownRenderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default()],
            lists: Vec::new(),
            code: None,
            link: None,
            quote_depth: 0,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn start_line(&mut self) {
        if self.spans.is_empty() && self.quote_depth > 0 {
            self.spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(Color::Blue),
            ));
        }
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = self.code.as_mut() {
            code.body.push_str(text);
            return;
        }
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush();
            }
            if !part.is_empty() {
                self.start_line();
                let style = self.style();
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn render(mut self, text: &str) -> Vec<Line<'static>> {
        let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES);

        for event in parser {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(tag) => self.end(tag),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => {
                    self.start_line();
                    self.spans.push(Span::styled(
                        code.to_string(),
                        Style::default().fg(Color::Yellow).bg(Color::Rgb(40, 40, 40)),
                    ));
                }
                Event::SoftBreak | Event::HardBreak => self.flush(),
                Event::Rule => {
                    self.flush();
                    self.lines.push(Line::from(Span::styled(
                        "─".repeat(self.width.min(60)),
                        GUTTER,
                    )));
                }
                _ => {}
            }
        }

        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.blank();
                let marker = match level {
                    HeadingLevel::H1 => "# ",
                    HeadingLevel::H2 => "## ",
                    HeadingLevel::H3 => "### ",
                    _ => "#### ",
                };
                let style = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);
                self.spans.push(Span::styled(marker, style));
                self.push_style(style);
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(Style::default().fg(Color::Blue));
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.split_whitespace().next().unwrap_or("").to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some(PendingCode {
                    lang,
                    body: String::new(),
                });
            }
            Tag::List(first) => {
                self.flush();
                self.lists.push(first);
            }
            Tag::Item => {
                self.flush();
                self.start_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{indent}{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => format!("{indent}• "),
                };
                self.spans
                    .push(Span::styled(bullet, Style::default().fg(Color::Cyan)));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT));
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.pop_style();
                self.flush();
            }
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::BlockQuote(_) => {
                self.pop_style();
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    push_code_block(&mut self.lines, &code.body, &code.lang, self.width);
                    self.lines.push(Line::default());
                }
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link.take() {
                    self.spans
                        .push(Span::styled(format!(" ({url})"), GUTTER));
                }
            }
            _ => {}
        }
    }
}
