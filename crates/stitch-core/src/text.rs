//! Small text helpers shared by header mapping, value coercion and stock
//! parsing.

use std::sync::OnceLock;

use regex::Regex;

/// Compiles `pattern` once into `cell`.
///
/// Patterns are literals, so a compile failure only disables the rule that
/// uses it.
pub(crate) fn cached_regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::error!("Invalid built-in pattern {pattern}: {e}");
            None
        }
    })
    .as_ref()
}

/// Replaces Spanish and common Latin diacritics with their base letter.
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'A',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Lowercased, diacritic-free form used for keyword comparisons.
pub fn fold(text: &str) -> String {
    fold_diacritics(text.trim()).to_lowercase()
}

/// Lowercase, diacritic-free, with whitespace and non-word characters
/// removed: `"Fecha de Entrega"` becomes `"fechadeentrega"`.
pub fn squash(text: &str) -> String {
    fold(text)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_and_squash() {
        assert_eq!(fold("  Diseño "), "diseno");
        assert_eq!(squash("Teléfono / Celular"), "telefonocelular");
        assert_eq!(squash("URL Diseño"), "urldiseno");
        assert_eq!(squash("N°"), "n");
    }

    #[test]
    fn test_cached_regex_reuses_compilation() {
        static CELL: OnceLock<Option<Regex>> = OnceLock::new();
        let first = cached_regex(&CELL, r"^\d+$").unwrap();
        let second = cached_regex(&CELL, r"^\d+$").unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.is_match("42"));
    }
}
