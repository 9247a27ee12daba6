//! Worksheet extraction from an "XML Spreadsheet" document.
//!
//! Layout: `Workbook` → `Worksheet` (`ss:Name`) → `Table` → `Row` →
//! `Cell` → `Data` (`ss:Type`). `ss:Index` on a row or cell is a 1-based
//! absolute position; anything it skips is empty. `ss:MergeAcross="n"`
//! makes a cell cover `n` further columns, which are left empty here.
//!
//! Elements are matched by local name so both prefixed and
//! default-namespace payloads work.

use crate::xml::{Document, Element};

/// Worksheet extraction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
    #[error("not an XML Spreadsheet workbook (root element <{0}>)")]
    NotAWorkbook(String),
    #[error("invalid ss:{attribute} {value:?} on <{element}>")]
    BadIndex {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

/// `ss:Type` of a cell's `Data` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Number,
    Boolean,
    DateTime,
    Error,
}

impl DataType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "String" => Some(DataType::String),
            "Number" => Some(DataType::Number),
            "Boolean" => Some(DataType::Boolean),
            "DateTime" => Some(DataType::DateTime),
            "Error" => Some(DataType::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: String,
    /// `None` for empty cells and unknown types.
    pub data_type: Option<DataType>,
}

impl Cell {
    /// Text as a spreadsheet shows it: booleans are stored as 1/0.
    pub fn display(&self) -> &str {
        match (self.data_type, self.value.as_str()) {
            (Some(DataType::Boolean), "1") => "TRUE",
            (Some(DataType::Boolean), "0") => "FALSE",
            (_, value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// Extract every worksheet of the workbook, in document order.
pub fn worksheets(doc: &Document) -> Result<Vec<Worksheet>, SheetError> {
    let root = doc.root();
    if root.name() != "Workbook" {
        return Err(SheetError::NotAWorkbook(root.name().to_string()));
    }

    root.elements_named("Worksheet").map(worksheet).collect()
}

fn worksheet(el: &Element) -> Result<Worksheet, SheetError> {
    let name = el.attribute("Name").unwrap_or_default().to_string();

    let mut rows = Vec::new();
    if let Some(table) = el.child("Table") {
        let bounds = Bounds::of(table);
        for row in table.elements_named("Row") {
            if let Some(index) = position(row, "Row", rows.len(), bounds.rows)? {
                rows.resize_with(index, Vec::new);
            }
            rows.push(cells(row, bounds.columns)?);
        }
    }

    tracing::debug!(worksheet = %name, rows = rows.len(), "extracted worksheet");
    Ok(Worksheet { name, rows })
}

/// Excel's sheet size.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Upper limits for `ss:Index` and `ss:MergeAcross` within one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    rows: usize,
    columns: usize,
}

impl Bounds {
    /// The table's declared `ss:ExpandedRowCount`/`ss:ExpandedColumnCount`,
    /// capped at the sheet size.
    fn of(table: &Element) -> Self {
        let declared = |attribute: &str, max: usize| {
            table
                .attribute(attribute)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .map_or(max, |n| n.min(max))
        };
        Self {
            rows: declared("ExpandedRowCount", MAX_ROWS),
            columns: declared("ExpandedColumnCount", MAX_COLUMNS),
        }
    }
}

fn cells(row: &Element, columns: usize) -> Result<Vec<Cell>, SheetError> {
    let mut out = Vec::new();
    for cell in row.elements_named("Cell") {
        if let Some(index) = position(cell, "Cell", out.len(), columns)? {
            out.resize_with(index, Cell::default);
        }

        let (value, data_type) = match cell.child("Data") {
            Some(data) => (data.text(), data.attribute("Type").and_then(DataType::parse)),
            None => (String::new(), None),
        };
        out.push(Cell { value, data_type });

        if let Some(raw) = cell.attribute("MergeAcross") {
            let Ok(merge) = raw.trim().parse::<usize>() else {
                continue;
            };
            let end = out
                .len()
                .checked_add(merge)
                .filter(|&end| end <= columns)
                .ok_or_else(|| SheetError::BadIndex {
                    element: "Cell",
                    attribute: "MergeAcross",
                    value: raw.to_string(),
                })?;
            out.resize_with(end, Cell::default);
        }
    }
    Ok(out)
}

/// Zero-based target position from `ss:Index`, if present.
///
/// The index may skip forward but never point at or before a slot that is
/// already filled, nor past `limit`.
fn position(
    el: &Element,
    element: &'static str,
    next: usize,
    limit: usize,
) -> Result<Option<usize>, SheetError> {
    let Some(raw) = el.attribute("Index") else {
        return Ok(None);
    };

    let bad = || SheetError::BadIndex {
        element,
        attribute: "Index",
        value: raw.to_string(),
    };
    let index = raw.trim().parse::<usize>().map_err(|_| bad())?;
    if index == 0 || index - 1 < next || index > limit {
        return Err(bad());
    }
    Ok(Some(index - 1))
}
