//! Loose line parser: any line ending in a number is a product and its
//! quantity.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::types::{LineItem, Quantity};

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)\s+(?P<quantity>\d+(?:[.,]\d+)?)\s*$").unwrap()
});

/// Requisites that look like "label number" but aren't products.
const FIELD_LABELS: &[&str] = &["инн", "кпп", "телефон", "email"];

/// Parse every `<name> <number>` line of `text`.
pub fn parse_lines(text: &str) -> Vec<LineItem> {
    text.lines()
        .filter_map(|line| {
            let caps = LINE.captures(line)?;
            let name = caps["name"].trim();
            if FIELD_LABELS.iter().any(|l| name.to_lowercase() == *l) {
                debug!(name, "Skipping requisite line");
                return None;
            }
            let quantity = Quantity::parse(&caps["quantity"]).unwrap_or_else(|| {
                warn!(name, quantity = &caps["quantity"], "Unreadable quantity, using 1");
                Quantity::default()
            });
            Some(LineItem::new(name, quantity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_ending_in_numbers() {
        let text = "Добрый день\nТройник 57x3.5 ст20   10\nОтвод 90 89x4 2,5\r\nспасибо";
        assert_eq!(
            parse_lines(text),
            vec![
                LineItem::new("Тройник 57x3.5 ст20", Quantity::Integer(10)),
                LineItem::new("Отвод 90 89x4", Quantity::Decimal(2.5)),
            ]
        );
    }

    #[test]
    fn requisite_labels_are_discarded() {
        let text = "ИНН 7701234567\nКПП 770101001\nТелефон 84951234567\nEmail 1\nЗадвижка 50-16 3";
        assert_eq!(
            parse_lines(text),
            vec![LineItem::new("Задвижка 50-16", Quantity::Integer(3))]
        );
    }

    #[test]
    fn number_alone_is_not_an_item() {
        assert!(parse_lines("42\n  \n").is_empty());
    }

    #[test]
    fn unreadable_quantity_defaults_to_one() {
        // `\d` accepts any Unicode digit; only ASCII ones parse.
        assert_eq!(
            parse_lines("Фланец 50-16 ٣"),
            vec![LineItem::new("Фланец 50-16", Quantity::Integer(1))]
        );
    }

    #[test]
    fn trailing_number_must_be_separated() {
        assert!(parse_lines("Фланец ду50").is_empty());
    }
}
