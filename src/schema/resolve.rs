use crate::markup::Element;

use super::{ATTR_FIELD_NAME, ATTR_TYPE};

const LABEL_TYPE: &str = "label";
const OPTION_CONTAINER_MARKER: &str = "TextGroup";

/// Finds the display label for `field_name` among the anchor's label elements.
///
/// A label tagged with the exact field name wins; otherwise the first label
/// whose text contains the name (case-insensitive) is used. Returns an empty
/// string when nothing matches.
pub fn resolve_label(anchor: &Element, field_name: &str) -> String {
    let labels: Vec<(&Element, String)> = anchor
        .walk()
        .filter(|element| element.attr_equals(ATTR_TYPE, LABEL_TYPE))
        .filter_map(|element| {
            let text = element.text().trim().to_string();
            (!text.is_empty()).then_some((element, text))
        })
        .collect();

    if let Some((_, text)) = labels
        .iter()
        .find(|(element, _)| element.attr_equals(ATTR_FIELD_NAME, field_name))
    {
        return text.clone();
    }

    let needle = field_name.to_lowercase();
    labels
        .into_iter()
        .find(|(_, text)| text.to_lowercase().contains(&needle))
        .map(|(_, text)| text)
        .unwrap_or_default()
}

/// Finds the display text of a choice option by its ticked-value token.
///
/// Candidates are elements whose `id` contains `TextGroup`, in document order;
/// the first whose nearest text contains the token wins.
pub fn resolve_option(anchor: &Element, token: &str) -> String {
    anchor
        .walk()
        .filter(|element| {
            element
                .attr("id")
                .is_some_and(|id| id.contains(OPTION_CONTAINER_MARKER))
        })
        .filter_map(nearest_text)
        .find(|text| text.contains(token))
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// First non-empty text in a depth-first walk of `element`.
fn nearest_text(element: &Element) -> Option<String> {
    element
        .walk()
        .map(Element::text)
        .find(|text| !text.trim().is_empty())
}
