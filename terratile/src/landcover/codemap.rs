//! Per-source code remap tables

use tracing::warn;

use super::dictionary::ClassDictionary;

/// One declared mapping from a source's raw code to a class name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMapping {
    /// Raw code as emitted by the coverage source.
    pub raw: u32,
    /// Name of the class in the shared dictionary.
    pub class_name: String,
}

impl CodeMapping {
    /// Creates a mapping.
    pub fn new(raw: u32, class_name: impl Into<String>) -> Self {
        Self {
            raw,
            class_name: class_name.into(),
        }
    }
}

/// Lookup table translating one source's raw codes into the shared
/// class vocabulary.
///
/// Sized to the highest declared raw code; undeclared codes and codes
/// whose class name is absent from the dictionary stay unmapped, which
/// makes the source contribute nothing at those pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMap {
    table: Vec<Option<i32>>,
}

impl CodeMap {
    /// Builds a remap table from declared mappings against a dictionary.
    pub fn build(mappings: &[CodeMapping], dictionary: &ClassDictionary) -> Self {
        let highest = mappings.iter().map(|m| m.raw).max();
        let mut table = match highest {
            Some(h) => vec![None; h as usize + 1],
            None => Vec::new(),
        };

        for mapping in mappings {
            match dictionary.class_by_name(&mapping.class_name) {
                Some(class) => table[mapping.raw as usize] = Some(class.value),
                None => warn!(
                    raw = mapping.raw,
                    class = %mapping.class_name,
                    "code mapping references a class missing from the dictionary"
                ),
            }
        }

        Self { table }
    }

    /// Translates a raw code, or `None` if it is unmapped.
    #[inline]
    pub fn remap(&self, raw: i32) -> Option<i32> {
        if raw < 0 {
            return None;
        }
        self.table.get(raw as usize).copied().flatten()
    }

    /// Size of the table (highest declared raw code + 1).
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no mappings were declared.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> ClassDictionary {
        let mut dict = ClassDictionary::new();
        dict.insert("forest", 2);
        dict.insert("water", 7);
        dict
    }

    #[test]
    fn test_declared_codes_remap() {
        let map = CodeMap::build(
            &[
                CodeMapping::new(5, "forest"),
                CodeMapping::new(9, "water"),
            ],
            &dictionary(),
        );

        assert_eq!(map.remap(5), Some(2));
        assert_eq!(map.remap(9), Some(7));
        assert_eq!(map.len(), 10);
    }

    #[test]
    fn test_undeclared_code_is_unmapped() {
        let map = CodeMap::build(
            &[
                CodeMapping::new(5, "forest"),
                CodeMapping::new(9, "water"),
            ],
            &dictionary(),
        );

        assert_eq!(map.remap(6), None, "raw 6 was never declared");
        assert_eq!(map.remap(100), None, "beyond the table is unmapped");
        assert_eq!(map.remap(-3), None, "negative codes are unmapped");
    }

    #[test]
    fn test_unknown_class_name_stays_unmapped() {
        let map = CodeMap::build(&[CodeMapping::new(1, "lava")], &dictionary());
        assert_eq!(map.remap(1), None);
    }

    #[test]
    fn test_empty_mappings() {
        let map = CodeMap::build(&[], &dictionary());
        assert!(map.is_empty());
        assert_eq!(map.remap(0), None);
    }
}
