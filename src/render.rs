use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use content_model_editor::convert::CHECKED_KEY;
use content_model_editor::model::{
    Block, BlockAddress, BlockGroup, GroupPath, ListLevel, ListType, Paragraph, PathStep, Segment, SegmentKind, Table,
};
use content_model_editor::selection::DomPosition;

use crate::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

/// The paragraph text a rendered line shows, for mapping clicks back to
/// caret positions.
#[derive(Clone, Debug)]
pub struct LineOrigin {
    pub paragraph: BlockAddress,
    pub start_offset: usize,
    pub prefix_width: usize,
    pub widths: Vec<usize>,
}

impl LineOrigin {
    pub fn position_at(&self, column: usize) -> DomPosition {
        let relative = column.saturating_sub(self.prefix_width);
        let mut used = 0;
        let mut count = 0;
        for width in &self.widths {
            if used + width > relative {
                break;
            }
            used += width;
            count += 1;
        }
        DomPosition::new(self.paragraph.clone(), self.start_offset + count)
    }
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    pub origins: Vec<Option<LineOrigin>>,
}

pub fn render_model(model: &BlockGroup, width: usize, theme: &Theme) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), theme);
    renderer.render_blocks(model, &GroupPath::root(), "");
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    theme: &'a Theme,
    lines: Vec<Line<'static>>,
    origins: Vec<Option<LineOrigin>>,
    cursor: Option<CursorVisualPosition>,
    /// Replaces the prefix of the next line pushed, e.g. a list bullet.
    pending_prefix: Option<String>,
}

#[derive(Clone)]
struct Glyph {
    ch: char,
    style: Style,
}

impl Glyph {
    fn width(&self) -> usize {
        self.ch.width().unwrap_or(0)
    }
}

#[derive(Default)]
struct LogicalLine {
    glyphs: Vec<Glyph>,
    start_offset: usize,
    caret: Option<usize>,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, theme: &'a Theme) -> Self {
        Self {
            wrap_width,
            theme,
            lines: Vec::new(),
            origins: Vec::new(),
            cursor: None,
            pending_prefix: None,
        }
    }

    fn render_blocks(&mut self, group: &BlockGroup, path: &GroupPath, indent: &str) {
        let mut ordinals: Vec<usize> = Vec::new();
        for (index, block) in group.blocks.iter().enumerate() {
            match block {
                Block::Paragraph(paragraph) => {
                    ordinals.clear();
                    self.render_paragraph(paragraph, BlockAddress::new(path.clone(), index), indent);
                }
                Block::BlockGroup(inner) => {
                    let inner_path = path.child(PathStep::Group(index));
                    if let Some(props) = inner.as_list_item() {
                        let marker = list_marker(&props.levels, &mut ordinals);
                        self.pending_prefix = Some(format!("{indent}{marker}"));
                        let continuation = format!("{indent}{}", " ".repeat(marker.width()));
                        self.render_blocks(inner, &inner_path, &continuation);
                        continue;
                    }
                    ordinals.clear();
                    match inner.format_container_tag() {
                        Some("blockquote") => self.render_blocks(inner, &inner_path, &format!("{indent}│ ")),
                        Some("pre") => self.render_blocks(inner, &inner_path, &format!("{indent}  ")),
                        _ => self.render_blocks(inner, &inner_path, indent),
                    }
                }
                Block::Table(table) => {
                    ordinals.clear();
                    self.render_table(table, path, index, indent);
                }
                Block::Divider(_) => {
                    ordinals.clear();
                    let rule = "─".repeat(self.wrap_width.saturating_sub(indent.width()).max(1));
                    self.push_plain_line(format!("{indent}{rule}"));
                }
                Block::Entity(entity) => {
                    ordinals.clear();
                    self.push_plain_line(format!("{indent}[{}]", entity.entity_type));
                }
            }
        }
    }

    fn render_table(&mut self, table: &Table, path: &GroupPath, index: usize, indent: &str) {
        let rule_width = self.wrap_width.saturating_sub(indent.width()).max(1);
        for (row_index, row) in table.rows.iter().enumerate() {
            self.push_plain_line(format!("{indent}{}", "┄".repeat(rule_width)));
            for (col_index, cell) in row.cells.iter().enumerate() {
                let cell_path = path.child(PathStep::Cell {
                    block: index,
                    row: row_index,
                    col: col_index,
                });
                self.render_blocks(cell, &cell_path, &format!("{indent}┆ "));
            }
        }
        self.push_plain_line(format!("{indent}{}", "┄".repeat(rule_width)));
    }

    fn render_paragraph(&mut self, paragraph: &Paragraph, address: BlockAddress, indent: &str) {
        let base = match paragraph.heading_level() {
            Some(1) => Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            Some(_) => Style::default().add_modifier(Modifier::BOLD),
            None => Style::default(),
        };
        let first_prefix = self.pending_prefix.take().unwrap_or_else(|| indent.to_string());

        for (line_index, line) in logical_lines(paragraph, base, self.theme).into_iter().enumerate() {
            let prefix = if line_index == 0 { first_prefix.as_str() } else { indent };
            let prefix_width = prefix.width();
            let available = self.wrap_width.saturating_sub(prefix_width).max(1);
            let ranges = wrap_ranges(&line.glyphs, available);
            let last = ranges.len() - 1;

            for (range_index, (start, end)) in ranges.into_iter().enumerate() {
                let prefix = if range_index == 0 { prefix } else { indent };
                let prefix_width = prefix.width();
                let glyphs = &line.glyphs[start..end];

                if let Some(caret) = line.caret
                    && start <= caret
                    && (caret < end || (caret == end && range_index == last))
                {
                    let column: usize = line.glyphs[start..caret].iter().map(Glyph::width).sum();
                    self.cursor = Some(CursorVisualPosition {
                        line: self.lines.len(),
                        column: (prefix_width + column) as u16,
                    });
                }

                let mut spans = vec![Span::styled(prefix.to_string(), self.theme.decoration_style())];
                spans.extend(styled_runs(glyphs));
                self.lines.push(Line::from(spans));
                self.origins.push(Some(LineOrigin {
                    paragraph: address.clone(),
                    start_offset: line.start_offset + start,
                    prefix_width,
                    widths: glyphs.iter().map(Glyph::width).collect(),
                }));
            }
        }
    }

    fn push_plain_line(&mut self, content: String) {
        let content = match self.pending_prefix.take() {
            Some(prefix) => format!("{prefix}{}", content.trim_start()),
            None => content,
        };
        self.lines
            .push(Line::from(vec![Span::styled(content, self.theme.decoration_style())]));
        self.origins.push(None);
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
            self.origins.push(None);
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
            origins: self.origins,
        }
    }
}

fn list_marker(levels: &[ListLevel], ordinals: &mut Vec<usize>) -> String {
    let depth = levels.len();
    let Some(level) = levels.last() else {
        return String::new();
    };
    ordinals.truncate(depth);
    ordinals.resize(depth, 0);
    ordinals[depth - 1] += 1;

    let nesting = "  ".repeat(depth - 1);
    if let Some(checked) = level.dataset.get(CHECKED_KEY) {
        let mark = if checked == "true" { "[✓] " } else { "[ ] " };
        return format!("{nesting}{mark}");
    }
    match level.list_type {
        ListType::Ordered => format!("{nesting}{}. ", ordinals[depth - 1]),
        ListType::Unordered => format!("{nesting}• "),
    }
}

/// Splits a paragraph at its line breaks. A trailing break only keeps the
/// caret visible, so it does not open an empty line of its own.
fn logical_lines(paragraph: &Paragraph, base: Style, theme: &Theme) -> Vec<LogicalLine> {
    let mut lines = vec![LogicalLine::default()];
    let mut offset = 0;
    for segment in &paragraph.segments {
        let Some(current) = lines.last_mut() else {
            break;
        };
        let style = segment_style(segment, base, theme);
        match &segment.kind {
            SegmentKind::SelectionMarker => current.caret = Some(current.glyphs.len()),
            SegmentKind::Br => {
                offset += 1;
                lines.push(LogicalLine {
                    start_offset: offset,
                    ..LogicalLine::default()
                });
            }
            SegmentKind::Text(text) => {
                for ch in text.chars() {
                    let ch = if ch == '\t' { ' ' } else { ch };
                    current.glyphs.push(Glyph { ch, style });
                    offset += 1;
                }
            }
            SegmentKind::Image(_) => {
                current.glyphs.push(Glyph { ch: '▣', style });
                offset += 1;
            }
            SegmentKind::Entity(_) | SegmentKind::General(_) => {
                current.glyphs.push(Glyph { ch: '◆', style });
                offset += 1;
            }
        }
    }
    if lines.len() > 1 && lines.last().is_some_and(|line| line.glyphs.is_empty() && line.caret.is_none()) {
        lines.pop();
    }
    lines
}

fn segment_style(segment: &Segment, base: Style, theme: &Theme) -> Style {
    let format = &segment.format;
    let mut style = base;
    if format.is_bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if format.italic == Some(true) {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if format.underline == Some(true) {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if format.strikethrough == Some(true) {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if format.background_color.is_some() {
        style = style.patch(theme.highlight_style());
    }
    if segment.code.is_some() {
        style = style.patch(theme.code_style());
    }
    if segment.link.is_some() {
        style = style.patch(theme.link_style());
    }
    if segment.is_selected && !segment.is_marker() {
        style = style.patch(theme.selection_style());
    }
    style
}

/// Greedy word wrap. Returns glyph ranges, one per visual line.
fn wrap_ranges(glyphs: &[Glyph], width: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < glyphs.len() {
        let mut used = 0;
        let mut end = start;
        let mut last_space = None;
        while end < glyphs.len() {
            let glyph_width = glyphs[end].width();
            if used + glyph_width > width && end > start {
                break;
            }
            if glyphs[end].ch == ' ' {
                last_space = Some(end);
            }
            used += glyph_width;
            end += 1;
        }
        if end < glyphs.len()
            && let Some(space) = last_space
        {
            end = space + 1;
        }
        ranges.push((start, end));
        start = end;
    }
    if ranges.is_empty() {
        ranges.push((0, 0));
    }
    ranges
}

fn styled_runs(glyphs: &[Glyph]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut style = None;
    for glyph in glyphs {
        if style.is_some_and(|current| current != glyph.style) {
            spans.push(Span::styled(std::mem::take(&mut text), style.unwrap_or_default()));
        }
        style = Some(glyph.style);
        text.push(glyph.ch);
    }
    if let Some(style) = style {
        spans.push(Span::styled(text, style));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_model_editor::model::SegmentFormat;

    fn plain(text: &str) -> Vec<Glyph> {
        text.chars()
            .map(|ch| Glyph {
                ch,
                style: Style::default(),
            })
            .collect()
    }

    #[test]
    fn wraps_at_spaces() {
        assert_eq!(wrap_ranges(&plain("hello world"), 8), vec![(0, 6), (6, 11)]);
        assert_eq!(wrap_ranges(&plain("abcdef"), 4), vec![(0, 4), (4, 6)]);
        assert_eq!(wrap_ranges(&[], 4), vec![(0, 0)]);
    }

    #[test]
    fn caret_and_click_positions_agree() {
        let model = BlockGroup::document().with_block(Paragraph::new().with_segments(vec![
            Segment::text("ab"),
            Segment::marker(SegmentFormat::default()),
            Segment::text("cd"),
        ]));

        let result = render_model(&model, 20, &Theme::default());

        assert_eq!(result.cursor, Some(CursorVisualPosition { line: 0, column: 2 }));
        let origin = result.origins[0].as_ref().expect("paragraph line");
        assert_eq!(origin.position_at(2).offset, 2);
    }

    #[test]
    fn caret_before_trailing_break_stays_on_its_line() {
        let model = BlockGroup::document().with_block(
            Paragraph::new().with_segments(vec![Segment::marker(SegmentFormat::default()), Segment::br()]),
        );

        let result = render_model(&model, 20, &Theme::default());

        assert_eq!(result.total_lines, 1);
        assert_eq!(result.cursor, Some(CursorVisualPosition { line: 0, column: 0 }));
    }
}
