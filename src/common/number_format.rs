//! Built-in number formats and date-format detection.
//!
//! Both file formats reference number formats by id; ids below 164 are
//! built in and never stored in the file. A cell is read as a date when its
//! style's number format is one of the built-in date formats or a custom
//! code containing date/time tokens.

use phf::phf_map;

/// Built-in number format codes by id (locale-independent subset).
static BUILTIN_FORMATS: phf::Map<u32, &'static str> = phf_map! {
    0u32 => "General",
    1u32 => "0",
    2u32 => "0.00",
    3u32 => "#,##0",
    4u32 => "#,##0.00",
    9u32 => "0%",
    10u32 => "0.00%",
    11u32 => "0.00E+00",
    12u32 => "# ?/?",
    13u32 => "# ??/??",
    14u32 => "m/d/yyyy",
    15u32 => "d-mmm-yy",
    16u32 => "d-mmm",
    17u32 => "mmm-yy",
    18u32 => "h:mm AM/PM",
    19u32 => "h:mm:ss AM/PM",
    20u32 => "h:mm",
    21u32 => "h:mm:ss",
    22u32 => "m/d/yyyy h:mm",
    37u32 => "#,##0 ;(#,##0)",
    38u32 => "#,##0 ;[Red](#,##0)",
    39u32 => "#,##0.00;(#,##0.00)",
    40u32 => "#,##0.00;[Red](#,##0.00)",
    45u32 => "mm:ss",
    46u32 => "[h]:mm:ss",
    47u32 => "mmss.0",
    48u32 => "##0.0E+0",
    49u32 => "@",
};

/// Look up the code of a built-in number format.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    BUILTIN_FORMATS.get(&id).copied()
}

/// Whether a built-in format id denotes a date or time.
pub fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Whether a custom format code renders its value as a date or time.
///
/// Quoted literals, escaped characters and bracketed sections (colors,
/// conditions, locales) are ignored; elapsed-time brackets (`[h]`, `[mm]`,
/// `[ss]`) count as time tokens. Only the first section is inspected.
pub fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            ';' => return false,
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            },
            '\\' | '_' | '*' => {
                chars.next();
            },
            '[' => {
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.to_ascii_lowercase();
                if !inner.is_empty() && inner.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            },
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {},
        }
    }
    false
}

/// Whether a format (by id and optional custom code) is a date format.
pub fn is_date_format(id: u32, code: Option<&str>) -> bool {
    match code {
        Some(code) => is_date_format_code(code),
        None => is_builtin_date_format(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin_format_code(0), Some("General"));
        assert_eq!(builtin_format_code(14), Some("m/d/yyyy"));
        assert_eq!(builtin_format_code(200), None);
    }

    #[test]
    fn test_builtin_date_ids() {
        assert!(is_builtin_date_format(14));
        assert!(is_builtin_date_format(22));
        assert!(is_builtin_date_format(46));
        assert!(!is_builtin_date_format(0));
        assert!(!is_builtin_date_format(49));
    }

    #[test]
    fn test_custom_date_codes() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("[$-409]d-mmm-yy;@"));
        assert!(is_date_format_code("[h]:mm"));
        assert!(!is_date_format_code("General"));
        assert!(!is_date_format_code("0.00"));
        assert!(!is_date_format_code("\"days\" 0"));
        assert!(!is_date_format_code("[Red]#,##0"));
        assert!(!is_date_format_code("0;\"yes\""));
    }

    #[test]
    fn test_is_date_format_prefers_custom_code() {
        assert!(is_date_format(164, Some("dd/mm/yyyy")));
        assert!(!is_date_format(14, Some("0.00")));
        assert!(is_date_format(14, None));
    }
}
