//! The content model: a parent-pointer free tree of block groups, blocks
//! and segments.
//!
//! Nodes never know their parents. Traversals carry an explicit ancestor
//! stack and mutations address nodes through the index paths in [`path`].

use std::collections::BTreeMap;

pub mod format;
pub mod path;

pub use format::{
    BlockFormat, BlockFormatKey, ImageFormat, ListLevelFormat, SegmentFormat, SegmentFormatKey,
    TableCellFormat, TableFormat,
};
pub use path::{BlockAddress, GroupPath, PathStep, SegmentLocation};

/// String keyed side data, the equivalent of `data-*` attributes.
pub type Dataset = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockGroupType {
    Document,
    General,
    FormatContainer,
    ListItem,
    TableCell,
}

/// A container of blocks. The root of every model is a block group of kind
/// [`BlockGroupKind::Document`].
#[derive(Clone, Debug, PartialEq)]
pub struct BlockGroup {
    pub kind: BlockGroupKind,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockGroupKind {
    Document(DocumentProps),
    General(GeneralProps),
    FormatContainer(FormatContainerProps),
    ListItem(ListItemProps),
    TableCell(TableCellProps),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentProps {
    /// Default segment format of the whole document.
    pub format: SegmentFormat,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneralProps {
    pub tag: String,
    pub format: BlockFormat,
    pub is_selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatContainerProps {
    /// `blockquote`, `pre`, `div` ...
    pub tag: String,
    pub format: BlockFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListItemProps {
    pub levels: Vec<ListLevel>,
    /// Carries the list level format (bullet color, number font). Always a
    /// selection-marker shaped segment and never visible content.
    pub format_holder: Segment,
    pub format: BlockFormat,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableCellProps {
    pub format: TableCellFormat,
    pub span_left: bool,
    pub span_above: bool,
    pub is_header: bool,
    pub is_selected: bool,
    pub dataset: Dataset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListType {
    Ordered,
    Unordered,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListLevel {
    pub list_type: ListType,
    pub format: ListLevelFormat,
    pub dataset: Dataset,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Divider(Divider),
    Entity(Entity),
    BlockGroup(BlockGroup),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
    pub format: BlockFormat,
    /// Ambient character format applied by the paragraph element itself.
    pub segment_format: Option<SegmentFormat>,
    pub decorator: Option<Decorator>,
    pub is_implicit: bool,
}

/// Heading or other paragraph level tag (`h1`..`h6`, `pre`, `p`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decorator {
    pub tag_name: String,
    pub format: SegmentFormat,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub widths: Vec<f64>,
    pub format: TableFormat,
    pub dataset: Dataset,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableRow {
    pub height: f64,
    pub format: BlockFormat,
    /// Every cell is a block group of kind [`BlockGroupKind::TableCell`].
    pub cells: Vec<BlockGroup>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Divider {
    pub tag: String,
    pub format: BlockFormat,
    pub is_selected: bool,
}

/// An opaque, host owned island of content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entity {
    pub entity_type: String,
    pub id: String,
    pub is_readonly: bool,
    pub format: SegmentFormat,
    /// Selection flag used when the entity is a block. Inline entities use
    /// the flag of their segment.
    pub is_selected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub format: SegmentFormat,
    pub is_selected: bool,
    pub link: Option<Link>,
    pub code: Option<Code>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentKind {
    Text(String),
    SelectionMarker,
    Image(Image),
    Entity(Entity),
    General(Box<BlockGroup>),
    Br,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub format: ImageFormat,
    pub dataset: Dataset,
    /// Set when the image itself (not a range around it) is the selection.
    pub is_selected_as_image_selection: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Link {
    pub href: String,
    pub target: Option<String>,
    pub format: SegmentFormat,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Code {
    pub format: SegmentFormat,
}

// ============================================================================
// Constructors
// ============================================================================

impl BlockGroup {
    pub fn document() -> Self {
        Self::document_with_format(SegmentFormat::default())
    }

    pub fn document_with_format(format: SegmentFormat) -> Self {
        Self {
            kind: BlockGroupKind::Document(DocumentProps { format }),
            blocks: Vec::new(),
        }
    }

    pub fn general(tag: impl Into<String>) -> Self {
        Self {
            kind: BlockGroupKind::General(GeneralProps {
                tag: tag.into(),
                ..GeneralProps::default()
            }),
            blocks: Vec::new(),
        }
    }

    pub fn format_container(tag: impl Into<String>) -> Self {
        Self {
            kind: BlockGroupKind::FormatContainer(FormatContainerProps {
                tag: tag.into(),
                format: BlockFormat::default(),
            }),
            blocks: Vec::new(),
        }
    }

    pub fn list_item(levels: Vec<ListLevel>, holder_format: SegmentFormat) -> Self {
        Self {
            kind: BlockGroupKind::ListItem(ListItemProps {
                levels,
                format_holder: Segment::format_holder(holder_format),
                format: BlockFormat::default(),
            }),
            blocks: Vec::new(),
        }
    }

    pub fn table_cell(span_left: bool, span_above: bool, is_header: bool, format: TableCellFormat) -> Self {
        Self {
            kind: BlockGroupKind::TableCell(TableCellProps {
                format,
                span_left,
                span_above,
                is_header,
                is_selected: false,
                dataset: Dataset::new(),
            }),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_block(mut self, block: impl Into<Block>) -> Self {
        self.blocks.push(block.into());
        self
    }
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn implicit() -> Self {
        Self {
            is_implicit: true,
            ..Self::default()
        }
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_format(mut self, format: BlockFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_segment_format(mut self, format: SegmentFormat) -> Self {
        self.segment_format = Some(format);
        self
    }

    pub fn with_decorator(mut self, tag_name: impl Into<String>, format: SegmentFormat) -> Self {
        self.decorator = Some(Decorator {
            tag_name: tag_name.into(),
            format,
        });
        self
    }

    /// Heading level derived from an `h1`..`h6` decorator.
    pub fn heading_level(&self) -> Option<u8> {
        let tag = self.decorator.as_ref()?.tag_name.to_ascii_lowercase();
        let level = tag.strip_prefix('h')?.parse::<u8>().ok()?;
        (1..=6).contains(&level).then_some(level)
    }

    pub fn marker_index(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_marker)
    }

    /// Visible text of the paragraph. Non-text segments other than markers
    /// count as one object replacement character so offsets line up with
    /// [`Segment::char_len`].
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match &segment.kind {
                SegmentKind::Text(text) => text.clone(),
                SegmentKind::SelectionMarker => String::new(),
                SegmentKind::Br => "\n".to_string(),
                _ => "\u{FFFC}".to_string(),
            })
            .collect()
    }

    pub fn char_len(&self) -> usize {
        self.segments.iter().map(Segment::char_len).sum()
    }
}

impl Segment {
    pub fn new(kind: SegmentKind) -> Self {
        Self {
            kind,
            format: SegmentFormat::default(),
            is_selected: false,
            link: None,
            code: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Text(text.into()))
    }

    /// A collapsed caret. Markers are always selected.
    pub fn marker(format: SegmentFormat) -> Self {
        Self {
            is_selected: true,
            format,
            ..Self::new(SegmentKind::SelectionMarker)
        }
    }

    pub(crate) fn format_holder(format: SegmentFormat) -> Self {
        Self {
            is_selected: false,
            format,
            ..Self::new(SegmentKind::SelectionMarker)
        }
    }

    pub fn br() -> Self {
        Self::new(SegmentKind::Br)
    }

    pub fn image(src: impl Into<String>) -> Self {
        Self::new(SegmentKind::Image(Image {
            src: src.into(),
            ..Image::default()
        }))
    }

    pub fn entity(entity: Entity) -> Self {
        Self::new(SegmentKind::Entity(entity))
    }

    pub fn general(group: BlockGroup) -> Self {
        Self::new(SegmentKind::General(Box::new(group)))
    }

    pub fn with_format(mut self, format: SegmentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_link(mut self, href: impl Into<String>) -> Self {
        self.link = Some(Link {
            href: href.into(),
            ..Link::default()
        });
        self
    }

    pub fn selected(mut self) -> Self {
        self.is_selected = true;
        self
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.kind, SegmentKind::SelectionMarker)
    }

    pub fn is_br(&self) -> bool {
        matches!(self.kind, SegmentKind::Br)
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.kind {
            SegmentKind::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Caret offsets this segment spans: characters for text, nothing for a
    /// marker, one for any other inline object.
    pub fn char_len(&self) -> usize {
        match &self.kind {
            SegmentKind::Text(text) => text.chars().count(),
            SegmentKind::SelectionMarker => 0,
            _ => 1,
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `rows` x `cols` table of empty cells.
    pub fn with_size(rows: usize, cols: usize) -> Self {
        let rows = (0..rows)
            .map(|_| TableRow {
                height: 0.0,
                format: BlockFormat::default(),
                cells: (0..cols)
                    .map(|_| BlockGroup::table_cell(false, false, false, TableCellFormat::default()))
                    .collect(),
            })
            .collect();
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&BlockGroup> {
        self.rows.get(row)?.cells.get(col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut BlockGroup> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }
}

impl Divider {
    pub fn hr() -> Self {
        Self {
            tag: "hr".to_string(),
            ..Self::default()
        }
    }
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            is_readonly: true,
            ..Self::default()
        }
    }
}

impl ListLevel {
    pub fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            format: ListLevelFormat::default(),
            dataset: Dataset::new(),
        }
    }
}

impl From<Paragraph> for Block {
    fn from(paragraph: Paragraph) -> Self {
        Block::Paragraph(paragraph)
    }
}

impl From<Table> for Block {
    fn from(table: Table) -> Self {
        Block::Table(table)
    }
}

impl From<Divider> for Block {
    fn from(divider: Divider) -> Self {
        Block::Divider(divider)
    }
}

impl From<Entity> for Block {
    fn from(entity: Entity) -> Self {
        Block::Entity(entity)
    }
}

impl From<BlockGroup> for Block {
    fn from(group: BlockGroup) -> Self {
        Block::BlockGroup(group)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl BlockGroup {
    pub fn group_type(&self) -> BlockGroupType {
        match &self.kind {
            BlockGroupKind::Document(_) => BlockGroupType::Document,
            BlockGroupKind::General(_) => BlockGroupType::General,
            BlockGroupKind::FormatContainer(_) => BlockGroupType::FormatContainer,
            BlockGroupKind::ListItem(_) => BlockGroupType::ListItem,
            BlockGroupKind::TableCell(_) => BlockGroupType::TableCell,
        }
    }

    /// Selection flag of groups that can be selected as a unit.
    pub fn is_selected(&self) -> bool {
        match &self.kind {
            BlockGroupKind::General(props) => props.is_selected,
            BlockGroupKind::TableCell(props) => props.is_selected,
            _ => false,
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        match &mut self.kind {
            BlockGroupKind::General(props) => props.is_selected = selected,
            BlockGroupKind::TableCell(props) => props.is_selected = selected,
            _ => {}
        }
    }

    pub fn document_format(&self) -> Option<&SegmentFormat> {
        match &self.kind {
            BlockGroupKind::Document(props) => Some(&props.format),
            _ => None,
        }
    }

    pub fn as_list_item(&self) -> Option<&ListItemProps> {
        match &self.kind {
            BlockGroupKind::ListItem(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_list_item_mut(&mut self) -> Option<&mut ListItemProps> {
        match &mut self.kind {
            BlockGroupKind::ListItem(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_table_cell(&self) -> Option<&TableCellProps> {
        match &self.kind {
            BlockGroupKind::TableCell(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_table_cell_mut(&mut self) -> Option<&mut TableCellProps> {
        match &mut self.kind {
            BlockGroupKind::TableCell(props) => Some(props),
            _ => None,
        }
    }

    pub fn format_container_tag(&self) -> Option<&str> {
        match &self.kind {
            BlockGroupKind::FormatContainer(props) => Some(&props.tag),
            _ => None,
        }
    }
}

impl Block {
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(paragraph) => Some(paragraph),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(paragraph) => Some(paragraph),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Block::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&BlockGroup> {
        match self {
            Block::BlockGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut BlockGroup> {
        match self {
            Block::BlockGroup(group) => Some(group),
            _ => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Block::Divider(divider) => divider.is_selected,
            Block::Entity(entity) => entity.is_selected,
            _ => false,
        }
    }
}
