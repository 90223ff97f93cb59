//! Terminal output utilities.

/// Format a value as a left-aligned field padded to a minimum width.
///
/// Values longer than `width` are kept whole; alignment is best-effort.
pub fn pad_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    if value_str.len() >= width {
        value_str
    } else {
        format!("{value_str:<width$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_field_short() {
        assert_eq!(pad_field("test", 8), "test    ");
    }

    #[test]
    fn test_pad_field_exact() {
        assert_eq!(pad_field("test", 4), "test");
    }

    #[test]
    fn test_pad_field_long() {
        assert_eq!(pad_field("long_value", 5), "long_value");
    }

    #[test]
    fn test_pad_field_number() {
        assert_eq!(pad_field(42, 4), "42  ");
    }
}
