/// One (article, quantity) pair from an order's line-item string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub article: String,
    pub quantity: i32,
}

/// Result of splitting a line-item string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLineItems {
    pub items: Vec<LineItem>,
    /// Pairs dropped because the quantity is not an integer
    pub invalid_quantities: usize,
}

/// Parses `"A100, 3, B200, 5"` into pairs. Tokens are comma separated and
/// trimmed, then taken two at a time; a trailing article without quantity
/// is dropped.
pub fn parse_line_items(raw: &str) -> ParsedLineItems {
    let mut parsed = ParsedLineItems::default();
    if raw.trim().is_empty() {
        return parsed;
    }

    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    for pair in tokens.chunks_exact(2) {
        match pair[1].parse::<i32>() {
            Ok(quantity) => parsed.items.push(LineItem {
                article: pair[0].to_string(),
                quantity,
            }),
            Err(_) => parsed.invalid_quantities += 1,
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(article: &str, quantity: i32) -> LineItem {
        LineItem {
            article: article.to_string(),
            quantity,
        }
    }

    #[test]
    fn two_pairs() {
        let parsed = parse_line_items("A100, 3, B200, 5");
        assert_eq!(parsed.items, vec![item("A100", 3), item("B200", 5)]);
        assert_eq!(parsed.invalid_quantities, 0);
    }

    #[test]
    fn trailing_article_is_dropped() {
        let parsed = parse_line_items("A100, 3, B200");
        assert_eq!(parsed.items, vec![item("A100", 3)]);
    }

    #[test]
    fn bad_quantity_skips_only_that_pair() {
        let parsed = parse_line_items("A100, three, B200, 5");
        assert_eq!(parsed.items, vec![item("B200", 5)]);
        assert_eq!(parsed.invalid_quantities, 1);
    }

    #[test]
    fn blank_string_has_no_items() {
        assert_eq!(parse_line_items("   "), ParsedLineItems::default());
        assert_eq!(parse_line_items(""), ParsedLineItems::default());
    }

    #[test]
    fn tolerates_missing_spaces() {
        let parsed = parse_line_items("A112T4,2,F635R4,1");
        assert_eq!(parsed.items, vec![item("A112T4", 2), item("F635R4", 1)]);
    }

    #[test]
    fn single_token_yields_nothing() {
        assert!(parse_line_items("A100").items.is_empty());
    }
}
