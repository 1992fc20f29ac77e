use crate::markup::Element;

/// Cell count used when a text field carries no `rect` elements.
pub const DEFAULT_CELL_COUNT: usize = 20;

pub fn count_cells(field: &Element) -> usize {
    match field
        .descendants()
        .filter(|element| element.tag == "rect")
        .count()
    {
        0 => DEFAULT_CELL_COUNT,
        count => count,
    }
}
