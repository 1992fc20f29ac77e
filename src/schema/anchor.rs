use tracing::warn;

use crate::error::ExtractError;
use crate::markup::Element;

const CONTAINER_TAG: &str = "div";
const ANCHOR_CLASS: &str = "formSide";
const ANCHOR_ID: &str = "formSide1";

/// Finds the `class="formSide" id="formSide1"` container among the root's
/// direct `div` children. Nothing outside it is ever inspected.
pub fn locate_anchor(root: &Element) -> Result<&Element, ExtractError> {
    if root.tag != CONTAINER_TAG {
        return Err(ExtractError::Structure(format!(
            "invalid root structure: expected <{CONTAINER_TAG}> root, found <{}>",
            root.tag
        )));
    }

    let containers: Vec<&Element> = root
        .child_elements()
        .filter(|child| child.tag == CONTAINER_TAG)
        .collect();
    if containers.is_empty() {
        return Err(ExtractError::Structure(
            "invalid root structure: no nested containers".to_string(),
        ));
    }

    containers
        .iter()
        .copied()
        .find(|container| {
            container.attr_equals("class", ANCHOR_CLASS) && container.attr_equals("id", ANCHOR_ID)
        })
        .ok_or_else(|| {
            let available: Vec<_> = containers
                .iter()
                .map(|container| &container.attributes)
                .collect();
            warn!(available = ?available, "no anchor container among top-level containers");
            ExtractError::Structure(format!(
                "no {ANCHOR_CLASS} container with id {ANCHOR_ID} found"
            ))
        })
}
