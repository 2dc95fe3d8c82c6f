//! Form field model
//!
//! A document's fields are reconstructed from two pdftk outputs: the flat
//! field dump (attributes) and the FDF export (which fields exist and how
//! their names nest). [`fuse`] joins the two and partitions the result into
//! grouped and standalone fields.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Separator between segments of a fully-qualified field name
pub const NAME_SEPARATOR: char = '.';

/// One form field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    /// Field type as reported by pdftk (Text, Button, Choice, Signature)
    pub field_type: String,
    /// Fully-qualified dotted field name
    pub field_name: String,
    /// Display label (pdftk's alternate field name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_name: Option<String>,
    /// Selectable states for checkbox, radio and choice fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_options: Vec<String>,
}

impl Field {
    /// First segment of the dotted name
    pub fn group_key(&self) -> &str {
        self.field_name
            .split(NAME_SEPARATOR)
            .next()
            .unwrap_or(&self.field_name)
    }
}

/// Two or more fields sharing the first segment of their names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GroupField {
    /// Shared first name segment
    pub group_name: String,
    /// Member fields, ordered by name
    pub fields: Vec<Field>,
}

/// Every usable form field of one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldInfo {
    /// Path of the source document
    pub pdf_path: String,
    /// Fields that share a name prefix with at least one sibling
    pub group_fields: Vec<GroupField>,
    /// Fields alone under their name prefix
    pub single_fields: Vec<Field>,
}

impl FieldInfo {
    /// Number of fields across groups and singles
    pub fn total_fields(&self) -> usize {
        self.single_fields.len()
            + self
                .group_fields
                .iter()
                .map(|g| g.fields.len())
                .sum::<usize>()
    }

    /// All fields, grouped ones first
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.group_fields
            .iter()
            .flat_map(|g| g.fields.iter())
            .chain(self.single_fields.iter())
    }

    /// Rewrite every field and group name with `f`.
    pub fn map_names<F: Fn(&str) -> String>(mut self, f: F) -> Self {
        for group in &mut self.group_fields {
            group.group_name = f(&group.group_name);
            for field in &mut group.fields {
                field.field_name = f(&field.field_name);
            }
        }
        for field in &mut self.single_fields {
            field.field_name = f(&field.field_name);
        }
        self
    }
}

/// Join dump records with hierarchy keys and group the survivors.
///
/// Only names present in both inputs are kept: the dump is the source of
/// attributes, the hierarchy the source of membership. Survivors are bucketed
/// by the first segment of their name; buckets with one member become single
/// fields, larger ones become groups. Output is sorted by name.
pub fn fuse(
    pdf_path: impl Into<String>,
    mut dump_fields: HashMap<String, Field>,
    hierarchy_keys: &BTreeSet<String>,
) -> FieldInfo {
    let mut buckets: BTreeMap<String, Vec<Field>> = BTreeMap::new();
    let mut missing_in_dump = 0usize;

    for key in hierarchy_keys {
        match dump_fields.remove(key) {
            Some(field) => buckets
                .entry(field.group_key().to_string())
                .or_default()
                .push(field),
            None => missing_in_dump += 1,
        }
    }

    if missing_in_dump > 0 || !dump_fields.is_empty() {
        tracing::debug!(
            missing_in_dump,
            missing_in_hierarchy = dump_fields.len(),
            "dropped fields not present in both pdftk outputs"
        );
    }

    let mut group_fields = Vec::new();
    let mut single_fields = Vec::new();
    for (group_name, mut fields) in buckets {
        if fields.len() > 1 {
            group_fields.push(GroupField { group_name, fields });
        } else if let Some(field) = fields.pop() {
            single_fields.push(field);
        }
    }

    FieldInfo {
        pdf_path: pdf_path.into(),
        group_fields,
        single_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_field(name: &str) -> Field {
        Field {
            field_type: "Text".to_string(),
            field_name: name.to_string(),
            ..Field::default()
        }
    }

    fn dump_of(names: &[&str]) -> HashMap<String, Field> {
        names
            .iter()
            .map(|n| (n.to_string(), text_field(n)))
            .collect()
    }

    fn keys_of(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_group_key() {
        assert_eq!(text_field("g.a.b").group_key(), "g");
        assert_eq!(text_field("plain").group_key(), "plain");
    }

    #[test]
    fn test_fuse_partitions_groups_and_singles() {
        let info = fuse(
            "/forms/a.pdf",
            dump_of(&["g.a", "g.b", "h"]),
            &keys_of(&["g.a", "g.b", "h"]),
        );

        assert_eq!(info.pdf_path, "/forms/a.pdf");
        assert_eq!(
            info.group_fields,
            vec![GroupField {
                group_name: "g".to_string(),
                fields: vec![text_field("g.a"), text_field("g.b")],
            }]
        );
        assert_eq!(info.single_fields, vec![text_field("h")]);
        assert_eq!(info.total_fields(), 3);
    }

    #[test]
    fn test_fuse_is_intersection() {
        let info = fuse(
            "a.pdf",
            dump_of(&["both", "dump_only"]),
            &keys_of(&["both", "hierarchy_only"]),
        );
        let names: Vec<&str> = info.fields().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["both"]);
    }

    #[test]
    fn test_fuse_single_nested_member_is_not_wrapped() {
        let info = fuse("a.pdf", dump_of(&["lonely.child"]), &keys_of(&["lonely.child"]));
        assert!(info.group_fields.is_empty());
        assert_eq!(info.single_fields, vec![text_field("lonely.child")]);
    }

    #[test]
    fn test_fuse_group_members_share_prefix() {
        let info = fuse(
            "a.pdf",
            dump_of(&["row.1.name", "row.2.name", "row.2.age", "total"]),
            &keys_of(&["row.1.name", "row.2.name", "row.2.age", "total"]),
        );
        assert_eq!(info.group_fields.len(), 1);
        let group = &info.group_fields[0];
        assert_eq!(group.group_name, "row");
        assert_eq!(group.fields.len(), 3);
        for field in &group.fields {
            assert!(field.field_name.starts_with("row."));
        }
    }

    #[test]
    fn test_fuse_prefix_collision_shares_bucket() {
        // a plain field named like a group joins that group's bucket
        let info = fuse("a.pdf", dump_of(&["g", "g.a"]), &keys_of(&["g", "g.a"]));
        assert_eq!(info.group_fields.len(), 1);
        assert_eq!(info.group_fields[0].fields.len(), 2);
        assert!(info.single_fields.is_empty());
    }

    #[test]
    fn test_fuse_empty_inputs() {
        let info = fuse("a.pdf", HashMap::new(), &BTreeSet::new());
        assert_eq!(info.total_fields(), 0);
    }

    #[test]
    fn test_map_names() {
        let info = fuse(
            "a.pdf",
            dump_of(&["g.a", "g.b", "h"]),
            &keys_of(&["g.a", "g.b", "h"]),
        )
        .map_names(|n| n.to_uppercase());
        assert_eq!(info.group_fields[0].group_name, "G");
        assert_eq!(info.group_fields[0].fields[1].field_name, "G.B");
        assert_eq!(info.single_fields[0].field_name, "H");
        assert_eq!(info.pdf_path, "a.pdf");
    }

    #[test]
    fn test_field_serialization_skips_empty() {
        let json = serde_json::to_value(text_field("name")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"field_type": "Text", "field_name": "name"})
        );

        let field = Field {
            field_type: "Button".to_string(),
            field_name: "agree".to_string(),
            view_name: Some("I agree".to_string()),
            field_options: vec!["Off".to_string(), "Yes".to_string()],
        };
        let json = serde_json::to_string(&field).unwrap();
        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }
}
