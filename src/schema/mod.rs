mod anchor;
mod cells;
mod discovery;
mod resolve;

use tracing::info;

use crate::error::ExtractError;
use crate::markup::MarkupParser;
use crate::model::FieldDescriptor;

pub use anchor::locate_anchor;
pub use cells::count_cells;
pub use discovery::discover_fields;
pub use resolve::{resolve_label, resolve_option};

pub const ATTR_TYPE: &str = "fdtType";
pub const ATTR_FORMAT: &str = "fdtFormat";
pub const ATTR_FIELD_NAME: &str = "fdtFieldName";
pub const ATTR_GROUP_NAME: &str = "fdtGroupName";
pub const ATTR_TICKED: &str = "fdtTicked";

pub struct SchemaExtractor {
    parser: MarkupParser,
}

impl SchemaExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            parser: MarkupParser::new()?,
        })
    }

    /// Parses `raw` and returns its fields in first-discovery order.
    pub fn extract(&self, raw: &str) -> Result<Vec<FieldDescriptor>, ExtractError> {
        let root = self.parser.parse(raw)?;
        let anchor = locate_anchor(&root)?;
        let fields = discover_fields(anchor);

        info!(field_count = fields.len(), "extracted form fields");
        Ok(fields)
    }
}
