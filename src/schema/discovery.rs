use std::collections::HashSet;

use tracing::debug;

use crate::markup::Element;
use crate::model::{ChoiceOption, FieldDescriptor, FieldKind, FieldShape};

use super::{
    ATTR_FIELD_NAME, ATTR_FORMAT, ATTR_GROUP_NAME, ATTR_TICKED, ATTR_TYPE, count_cells,
    resolve_label, resolve_option,
};

const TYPE_ISO: &str = "iso";
const TYPE_RADIO_LIST: &str = "radioList";
const TYPE_SIGNATURE: &str = "cursiveSignature";
const FORMAT_ALPHA: &str = "Alpha";
const FORMAT_DATE: &str = "DD/MM/YYYY";

/// Why a field-defining element produced nothing. Logged, never surfaced.
#[derive(Debug, thiserror::Error)]
enum FieldSkipped {
    #[error("missing {0} attribute")]
    MissingAttribute(&'static str),
    #[error("field {0} already processed")]
    AlreadyProcessed(String),
    #[error("option {token} of group {group} already processed")]
    DuplicateOption { group: String, token: String },
    #[error("unrecognized iso format {0:?}")]
    UnrecognizedFormat(String),
    #[error("group {name} already names a {existing} field")]
    KindCollision { name: String, existing: FieldKind },
}

#[derive(Debug, Default)]
struct FieldAccumulator {
    fields: Vec<FieldDescriptor>,
    processed: HashSet<String>,
    processed_options: HashSet<(String, String)>,
}

impl FieldAccumulator {
    fn visit(&mut self, anchor: &Element, element: &Element) {
        let Some(field_type) = element.attr(ATTR_TYPE) else {
            return;
        };

        let outcome = match field_type {
            TYPE_ISO => self.visit_iso(anchor, element),
            TYPE_RADIO_LIST => self.visit_choice(anchor, element),
            TYPE_SIGNATURE => self.visit_signature(anchor, element),
            _ => return,
        };

        if let Err(reason) = outcome {
            debug!(
                tag = %element.tag,
                field_type,
                reason = %reason,
                "skipped field element"
            );
        }
    }

    fn visit_iso(&mut self, anchor: &Element, element: &Element) -> Result<(), FieldSkipped> {
        let name = self.unclaimed_name(element)?;
        let format = element.attr(ATTR_FORMAT).unwrap_or_default();

        let shape = if format.contains(FORMAT_ALPHA) {
            FieldShape::Text {
                length: count_cells(element),
            }
        } else if format.contains(FORMAT_DATE) {
            FieldShape::Date
        } else {
            return Err(FieldSkipped::UnrecognizedFormat(format.to_string()));
        };

        self.push_labelled(anchor, name, shape);
        Ok(())
    }

    fn visit_signature(&mut self, anchor: &Element, element: &Element) -> Result<(), FieldSkipped> {
        let name = self.unclaimed_name(element)?;
        self.push_labelled(anchor, name, FieldShape::Signature);
        Ok(())
    }

    fn visit_choice(&mut self, anchor: &Element, element: &Element) -> Result<(), FieldSkipped> {
        let group = required(element, ATTR_GROUP_NAME)?;
        let token = required(element, ATTR_TICKED)?;

        let key = (group.to_string(), token.to_string());
        if self.processed_options.contains(&key) {
            return Err(FieldSkipped::DuplicateOption {
                group: key.0,
                token: key.1,
            });
        }

        let display = match resolve_option(anchor, token) {
            text if text.is_empty() => token.to_string(),
            text => text,
        };
        let option = ChoiceOption {
            display,
            token: token.to_string(),
        };

        match self.fields.iter_mut().find(|field| field.name == group) {
            Some(existing) => match &mut existing.shape {
                FieldShape::Choice { options } => options.push(option),
                _ => {
                    return Err(FieldSkipped::KindCollision {
                        name: group.to_string(),
                        existing: existing.kind(),
                    });
                }
            },
            None => {
                self.processed.insert(group.to_string());
                self.fields.push(FieldDescriptor {
                    name: group.to_string(),
                    label: group.to_string(),
                    shape: FieldShape::Choice {
                        options: vec![option],
                    },
                });
            }
        }

        self.processed_options.insert(key);
        Ok(())
    }

    fn unclaimed_name<'e>(&self, element: &'e Element) -> Result<&'e str, FieldSkipped> {
        let name = required(element, ATTR_FIELD_NAME)?;
        if self.processed.contains(name) {
            return Err(FieldSkipped::AlreadyProcessed(name.to_string()));
        }
        Ok(name)
    }

    fn push_labelled(&mut self, anchor: &Element, name: &str, shape: FieldShape) {
        let label = match resolve_label(anchor, name) {
            text if text.is_empty() => name.to_string(),
            text => text,
        };

        self.processed.insert(name.to_string());
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            label,
            shape,
        });
    }
}

fn required<'e>(element: &'e Element, attribute: &'static str) -> Result<&'e str, FieldSkipped> {
    element
        .attr(attribute)
        .ok_or(FieldSkipped::MissingAttribute(attribute))
}

/// Walks the anchor subtree in document order and folds every field-defining
/// element into the field list.
pub fn discover_fields(anchor: &Element) -> Vec<FieldDescriptor> {
    anchor
        .walk()
        .fold(FieldAccumulator::default(), |mut acc, element| {
            acc.visit(anchor, element);
            acc
        })
        .fields
}
