//! Shared land cover class vocabulary

/// One class in the shared vocabulary, e.g. "forest" = 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandCoverClass {
    pub name: String,
    pub value: i32,
}

/// Dictionary of land cover classes shared by every coverage source.
///
/// Coverage sources declare mappings from their raw codes to class
/// names; the dictionary resolves those names to the numeric values
/// that end up in composited rasters, and translates composited values
/// back to human-meaningful classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDictionary {
    classes: Vec<LandCoverClass>,
}

impl ClassDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class, replacing any existing class with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: i32) {
        let name = name.into();
        if let Some(existing) = self.classes.iter_mut().find(|c| c.name == name) {
            existing.value = value;
        } else {
            self.classes.push(LandCoverClass { name, value });
        }
    }

    /// Resolves a class by name.
    pub fn class_by_name(&self, name: &str) -> Option<&LandCoverClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Resolves a class by its numeric value.
    pub fn class_by_value(&self, value: i32) -> Option<&LandCoverClass> {
        self.classes.iter().find(|c| c.value == value)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no classes are defined.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<(String, i32)> for ClassDictionary {
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        let mut dict = ClassDictionary::new();
        for (name, value) in iter {
            dict.insert(name, value);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_and_value() {
        let mut dict = ClassDictionary::new();
        dict.insert("forest", 2);
        dict.insert("water", 7);

        assert_eq!(dict.class_by_name("forest").unwrap().value, 2);
        assert_eq!(dict.class_by_value(7).unwrap().name, "water");
        assert!(dict.class_by_name("urban").is_none());
        assert!(dict.class_by_value(99).is_none());
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut dict = ClassDictionary::new();
        dict.insert("forest", 2);
        dict.insert("forest", 5);

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.class_by_name("forest").unwrap().value, 5);
    }

    #[test]
    fn test_from_iterator() {
        let dict: ClassDictionary = [("forest".to_string(), 2), ("water".to_string(), 7)]
            .into_iter()
            .collect();
        assert_eq!(dict.len(), 2);
        assert!(!dict.is_empty());
    }
}
