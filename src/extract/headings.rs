use scraper::Html;

use super::{element_text, select_all};
use crate::report::Headings;

pub(super) fn extract(doc: &Html) -> Headings {
    let mut headings = Headings::default();
    for level in 1..=6u8 {
        let texts = select_all(doc, &format!("h{level}"))
            .iter()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();
        if let Some(slot) = headings.level_mut(level) {
            *slot = texts;
        }
    }
    headings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_are_normalized_and_blank_ones_dropped() {
        let doc = Html::parse_document(
            "<h1>  Main\n   title </h1><h2>A</h2><h2> </h2><h3><span>Nested</span> text</h3><h2>B</h2>",
        );
        let headings = extract(&doc);
        assert_eq!(headings.h1, vec!["Main title"]);
        assert_eq!(headings.h2, vec!["A", "B"]);
        assert_eq!(headings.h3, vec!["Nested text"]);
        assert!(headings.h6.is_empty());
    }
}
