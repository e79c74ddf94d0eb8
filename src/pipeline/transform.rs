//! Provenance prefixing.
//!
//! The leading token of the object key (up to the first `_`) names the shop
//! that uploaded the file. It becomes the first field of every non-blank row.

/// Separator between the provenance token and the rest of the object key.
pub const KEY_DELIMITER: char = '_';

/// Provenance identifier for an object key. A key without the delimiter is
/// used whole.
pub fn provenance_id(object_key: &str) -> &str {
    object_key
        .split_once(KEY_DELIMITER)
        .map_or(object_key, |(head, _)| head)
}

/// Prefix every non-blank line with the provenance identifier and strip
/// carriage returns. Blank lines stay (as empty lines); the trailing-newline
/// structure of the input is preserved.
pub fn transform(payload: &str, object_key: &str) -> String {
    let id = provenance_id(object_key);

    payload
        .split('\n')
        .map(|line| {
            let line = line.replace('\r', "");
            if line.trim().is_empty() {
                line
            } else {
                format!("{id},{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_is_leading_token() {
        assert_eq!(provenance_id("shop1_2024.csv"), "shop1");
        assert_eq!(provenance_id("shop2_20240101_extra.csv"), "shop2");
    }

    #[test]
    fn key_without_delimiter_used_whole() {
        assert_eq!(provenance_id("inventory.csv"), "inventory.csv");
    }

    #[test]
    fn prefixes_non_empty_line() {
        assert_eq!(transform("a,b,c", "shop1_2024.csv"), "shop1,a,b,c");
    }

    #[test]
    fn empty_lines_stay_empty() {
        assert_eq!(
            transform("a,b\n\nc,d\n", "shop1_2024.csv"),
            "shop1,a,b\n\nshop1,c,d\n"
        );
    }

    #[test]
    fn carriage_returns_removed() {
        assert_eq!(
            transform("a,b\r\nc,d\r\n", "shop1_2024.csv"),
            "shop1,a,b\nshop1,c,d\n"
        );
    }

    #[test]
    fn whitespace_only_line_not_prefixed() {
        assert_eq!(transform("a\n   \nb", "s_x"), "s,a\n   \ns,b");
    }

    #[test]
    fn lone_carriage_return_line_becomes_empty() {
        assert_eq!(transform("a\r\n\r\nb", "s_x"), "s,a\n\ns,b");
    }

    #[test]
    fn empty_payload_stays_empty() {
        assert_eq!(transform("", "shop1_2024.csv"), "");
    }
}
