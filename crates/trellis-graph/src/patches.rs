//! Property patches applied to entities on update.
//!
//! Patches follow the JSON-patch shape with paths rooted at a property base
//! URL. Before-update hooks inspect them to enforce immutability rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element of a property path: a property base URL or an array index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyPathElement {
    Property(String),
    Index(usize),
}

pub type PropertyPath = Vec<PropertyPathElement>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PropertyPatch {
    Add { path: PropertyPath, value: Value },
    Replace { path: PropertyPath, value: Value },
    Remove { path: PropertyPath },
}

impl PropertyPatch {
    pub fn path(&self) -> &PropertyPath {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }

    fn targets_property(&self, base_url: &str) -> bool {
        matches!(
            self.path().as_slice(),
            [PropertyPathElement::Property(url)] if url == base_url
        )
    }
}

/// Whether the patches remove the whole property rooted at `base_url`.
pub fn is_value_removed_by_patches(base_url: &str, patches: &[PropertyPatch]) -> bool {
    patches
        .iter()
        .any(|patch| matches!(patch, PropertyPatch::Remove { .. }) && patch.targets_property(base_url))
}

/// The value the patches set for the property rooted at `base_url`, if any.
pub fn get_defined_property_from_patches<'p>(
    patches: &'p [PropertyPatch],
    base_url: &str,
) -> Option<&'p Value> {
    patches.iter().find_map(|patch| match patch {
        PropertyPatch::Add { value, .. } | PropertyPatch::Replace { value, .. }
            if patch.targets_property(base_url) =>
        {
            Some(value)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SHORTNAME: &str = "https://example.com/types/property-type/shortname/";

    fn property_path(base_url: &str) -> PropertyPath {
        vec![PropertyPathElement::Property(base_url.to_string())]
    }

    #[test]
    fn remove_of_whole_property_is_detected() {
        let patches = vec![PropertyPatch::Remove {
            path: property_path(SHORTNAME),
        }];
        assert!(is_value_removed_by_patches(SHORTNAME, &patches));
        assert!(!is_value_removed_by_patches("https://example.com/other/", &patches));
    }

    #[test]
    fn nested_remove_is_not_a_property_removal() {
        let patches = vec![PropertyPatch::Remove {
            path: vec![
                PropertyPathElement::Property(SHORTNAME.to_string()),
                PropertyPathElement::Index(0),
            ],
        }];
        assert!(!is_value_removed_by_patches(SHORTNAME, &patches));
    }

    #[test]
    fn defined_property_comes_from_add_or_replace() {
        let patches = vec![
            PropertyPatch::Remove {
                path: property_path("https://example.com/unrelated/"),
            },
            PropertyPatch::Replace {
                path: property_path(SHORTNAME),
                value: json!("new-name"),
            },
        ];
        assert_eq!(
            get_defined_property_from_patches(&patches, SHORTNAME),
            Some(&json!("new-name"))
        );
        assert_eq!(
            get_defined_property_from_patches(&patches, "https://example.com/missing/"),
            None
        );
    }

    #[test]
    fn patch_json_shape_is_json_patch_like() {
        let patch = PropertyPatch::Replace {
            path: property_path(SHORTNAME),
            value: json!("ada"),
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            json!({ "op": "replace", "path": [SHORTNAME], "value": "ada" })
        );
    }
}
