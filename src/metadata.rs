//! Structured formatting metadata stored as JSON in a dataset entry.
//!
//! Values are checked against a small declarative [`Definition`] before they
//! are decoded. Anything malformed reads as "no metadata".

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::warn;

use crate::model::{BlockGroup, Dataset, Image, ListLevel, Table};

pub const METADATA_KEY: &str = "editingInfo";

#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub optional: bool,
    pub allow_null: bool,
    pub kind: DefinitionKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DefinitionKind {
    String,
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    Array(Box<Definition>),
    Object(Vec<(&'static str, Definition)>),
}

impl Definition {
    fn of(kind: DefinitionKind) -> Self {
        Self {
            optional: false,
            allow_null: false,
            kind,
        }
    }

    pub fn string() -> Self {
        Self::of(DefinitionKind::String)
    }

    pub fn number(min: Option<f64>, max: Option<f64>) -> Self {
        Self::of(DefinitionKind::Number { min, max })
    }

    pub fn boolean() -> Self {
        Self::of(DefinitionKind::Boolean)
    }

    pub fn array(item: Definition) -> Self {
        Self::of(DefinitionKind::Array(Box::new(item)))
    }

    pub fn object(properties: Vec<(&'static str, Definition)>) -> Self {
        Self::of(DefinitionKind::Object(properties))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }
}

pub fn validate(value: &Value, definition: &Definition) -> bool {
    if value.is_null() {
        return definition.allow_null;
    }
    match &definition.kind {
        DefinitionKind::String => value.is_string(),
        DefinitionKind::Boolean => value.is_boolean(),
        DefinitionKind::Number { min, max } => value.as_f64().is_some_and(|number| {
            min.is_none_or(|min| number >= min) && max.is_none_or(|max| number <= max)
        }),
        DefinitionKind::Array(item) => value
            .as_array()
            .is_some_and(|items| items.iter().all(|entry| validate(entry, item))),
        DefinitionKind::Object(properties) => value.as_object().is_some_and(|object| {
            properties
                .iter()
                .all(|(name, property)| match object.get(*name) {
                    Some(entry) => validate(entry, property),
                    None => property.optional,
                })
        }),
    }
}

/// Reads the metadata of `dataset`.
pub fn get_metadata<T: DeserializeOwned>(dataset: &Dataset, definition: Option<&Definition>) -> Option<T> {
    let raw = dataset.get(METADATA_KEY)?;
    let value: Value = serde_json::from_str(raw).ok()?;
    if definition.is_some_and(|definition| !validate(&value, definition)) {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Passes the current metadata (or `None`) to `callback` and stores what it
/// returns. Returning `None` removes the metadata.
pub fn update_metadata<T, F>(dataset: &mut Dataset, definition: Option<&Definition>, callback: F) -> Option<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(Option<T>) -> Option<T>,
{
    let updated = callback(get_metadata(dataset, definition));
    match &updated {
        Some(metadata) => match serde_json::to_string(metadata) {
            Ok(json) => {
                dataset.insert(METADATA_KEY.to_string(), json);
            }
            Err(err) => warn!(error = %err, "failed to encode metadata"),
        },
        None => {
            dataset.remove(METADATA_KEY);
        }
    }
    updated
}

// ============================================================================
// Table metadata
// ============================================================================

/// Border layout presets of a formatted table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TableBorderFormat {
    /// Every cell has all four borders.
    #[default]
    Default,
    /// Only the outer frame and the header row separator.
    ListWithSideBorders,
    /// The header row has no borders.
    NoHeaderBorders,
    /// No left border on the first column and no right border on the last.
    NoSideBorders,
    FirstColumnHeaderExternal,
    /// No borders at all.
    Clear,
}

impl From<TableBorderFormat> for u8 {
    fn from(format: TableBorderFormat) -> Self {
        match format {
            TableBorderFormat::Default => 0,
            TableBorderFormat::ListWithSideBorders => 1,
            TableBorderFormat::NoHeaderBorders => 2,
            TableBorderFormat::NoSideBorders => 3,
            TableBorderFormat::FirstColumnHeaderExternal => 4,
            TableBorderFormat::Clear => 8,
        }
    }
}

impl TryFrom<u8> for TableBorderFormat {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TableBorderFormat::Default),
            1 => Ok(TableBorderFormat::ListWithSideBorders),
            2 => Ok(TableBorderFormat::NoHeaderBorders),
            3 => Ok(TableBorderFormat::NoSideBorders),
            4 => Ok(TableBorderFormat::FirstColumnHeaderExternal),
            8 => Ok(TableBorderFormat::Clear),
            other => Err(format!("unknown table border format {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableMetadataFormat {
    pub top_border_color: Option<String>,
    pub bottom_border_color: Option<String>,
    pub vertical_border_color: Option<String>,
    pub has_header_row: bool,
    pub header_row_color: Option<String>,
    pub has_first_column: bool,
    pub has_banded_columns: bool,
    pub has_banded_rows: bool,
    pub bg_color_even: Option<String>,
    pub bg_color_odd: Option<String>,
    pub table_border_format: TableBorderFormat,
    pub vertical_align: Option<String>,
}

impl Default for TableMetadataFormat {
    fn default() -> Self {
        Self {
            top_border_color: Some("#ABABAB".to_string()),
            bottom_border_color: Some("#ABABAB".to_string()),
            vertical_border_color: Some("#ABABAB".to_string()),
            has_header_row: false,
            header_row_color: Some("#ABABAB".to_string()),
            has_first_column: false,
            has_banded_columns: false,
            has_banded_rows: false,
            bg_color_even: None,
            bg_color_odd: Some("#ABABAB20".to_string()),
            table_border_format: TableBorderFormat::Default,
            vertical_align: None,
        }
    }
}

pub fn table_format_definition() -> Definition {
    let color = || Definition::string().optional().nullable();
    let flag = || Definition::boolean().optional();
    Definition::object(vec![
        ("topBorderColor", color()),
        ("bottomBorderColor", color()),
        ("verticalBorderColor", color()),
        ("hasHeaderRow", flag()),
        ("headerRowColor", color()),
        ("hasFirstColumn", flag()),
        ("hasBandedColumns", flag()),
        ("hasBandedRows", flag()),
        ("bgColorEven", color()),
        ("bgColorOdd", color()),
        ("tableBorderFormat", Definition::number(Some(0.0), Some(8.0)).optional()),
        ("verticalAlign", color()),
    ])
}

pub fn update_table_metadata<F>(table: &mut Table, callback: F) -> Option<TableMetadataFormat>
where
    F: FnOnce(Option<TableMetadataFormat>) -> Option<TableMetadataFormat>,
{
    update_metadata(&mut table.dataset, Some(&table_format_definition()), callback)
}

pub fn table_metadata(table: &Table) -> Option<TableMetadataFormat> {
    get_metadata(&table.dataset, Some(&table_format_definition()))
}

/// Per-cell flags that keep manual formatting when the table format is
/// re-applied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCellMetadataFormat {
    pub bg_color_override: bool,
    pub v_align_override: bool,
    pub border_override: bool,
}

pub fn table_cell_format_definition() -> Definition {
    Definition::object(vec![
        ("bgColorOverride", Definition::boolean().optional()),
        ("vAlignOverride", Definition::boolean().optional()),
        ("borderOverride", Definition::boolean().optional()),
    ])
}

/// Updates the metadata of a table cell. Other groups have none.
pub fn update_table_cell_metadata<F>(cell: &mut BlockGroup, callback: F) -> Option<TableCellMetadataFormat>
where
    F: FnOnce(Option<TableCellMetadataFormat>) -> Option<TableCellMetadataFormat>,
{
    let props = cell.as_table_cell_mut()?;
    update_metadata(&mut props.dataset, Some(&table_cell_format_definition()), callback)
}

pub fn table_cell_metadata(cell: &BlockGroup) -> Option<TableCellMetadataFormat> {
    get_metadata(&cell.as_table_cell()?.dataset, Some(&table_cell_format_definition()))
}

// ============================================================================
// Image metadata
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageMetadataFormat {
    pub width_px: Option<f64>,
    pub height_px: Option<f64>,
    pub left_percent: Option<f64>,
    pub right_percent: Option<f64>,
    pub top_percent: Option<f64>,
    pub bottom_percent: Option<f64>,
    pub angle_rad: Option<f64>,
    pub src: Option<String>,
    pub natural_width: Option<f64>,
    pub natural_height: Option<f64>,
    pub flipped_horizontal: Option<bool>,
    pub flipped_vertical: Option<bool>,
}

pub fn image_format_definition() -> Definition {
    let size = || Definition::number(Some(0.0), None).optional();
    let percent = || Definition::number(Some(0.0), Some(1.0)).optional();
    Definition::object(vec![
        ("widthPx", size()),
        ("heightPx", size()),
        ("leftPercent", percent()),
        ("rightPercent", percent()),
        ("topPercent", percent()),
        ("bottomPercent", percent()),
        ("angleRad", Definition::number(None, None).optional()),
        ("src", Definition::string().optional()),
        ("naturalWidth", size()),
        ("naturalHeight", size()),
        ("flippedHorizontal", Definition::boolean().optional()),
        ("flippedVertical", Definition::boolean().optional()),
    ])
}

pub fn update_image_metadata<F>(image: &mut Image, callback: F) -> Option<ImageMetadataFormat>
where
    F: FnOnce(Option<ImageMetadataFormat>) -> Option<ImageMetadataFormat>,
{
    update_metadata(&mut image.dataset, Some(&image_format_definition()), callback)
}

pub fn image_metadata(image: &Image) -> Option<ImageMetadataFormat> {
    get_metadata(&image.dataset, Some(&image_format_definition()))
}

// ============================================================================
// List metadata
// ============================================================================

pub const ORDERED_STYLE_MAX: f64 = 13.0;
pub const UNORDERED_STYLE_MAX: f64 = 9.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListMetadataFormat {
    /// 1 decimal, 5 lower alpha, 9 upper alpha, 13 lower roman ...
    pub ordered_style_type: Option<u8>,
    /// 1 disc, 2 dash, 3 square ...
    pub unordered_style_type: Option<u8>,
    pub apply_list_style_from_level: Option<bool>,
}

pub fn list_format_definition() -> Definition {
    Definition::object(vec![
        (
            "orderedStyleType",
            Definition::number(Some(1.0), Some(ORDERED_STYLE_MAX)).optional().nullable(),
        ),
        (
            "unorderedStyleType",
            Definition::number(Some(1.0), Some(UNORDERED_STYLE_MAX)).optional().nullable(),
        ),
        ("applyListStyleFromLevel", Definition::boolean().optional().nullable()),
    ])
}

pub fn update_list_metadata<F>(level: &mut ListLevel, callback: F) -> Option<ListMetadataFormat>
where
    F: FnOnce(Option<ListMetadataFormat>) -> Option<ListMetadataFormat>,
{
    update_metadata(&mut level.dataset, Some(&list_format_definition()), callback)
}

pub fn list_metadata(level: &ListLevel) -> Option<ListMetadataFormat> {
    get_metadata(&level.dataset, Some(&list_format_definition()))
}
