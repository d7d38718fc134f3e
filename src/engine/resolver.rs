//! Referential integrity resolver.
//!
//! No pre-pass mapping is materialized. Related columns are instead
//! rewired at load time to the primary column's declared data type, so
//! the pure generator produces byte-identical synthetic values for equal
//! originals on both sides. `derived` relationships keep their own type:
//! the generator's purity already makes them a deterministic function of
//! the original.

use super::{EngineError, Result};
use crate::config::{MappingDocument, RelationshipKind};

/// Rewire related columns to match their primary column's data type.
///
/// A divergent declaration is rewritten with a warning, or rejected when
/// strict mode is on. The loader has already verified every endpoint
/// exists in the mapping.
pub fn resolve_relationships(doc: &mut MappingDocument) -> Result<()> {
    let strict = doc.referential_integrity.strict_mode;
    let relationships = doc.referential_integrity.relationships.clone();

    for rel in &relationships {
        let rel_name = rel
            .name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", rel.primary_table, rel.primary_column));

        let primary_type = doc
            .tables
            .iter()
            .filter(|t| t.full_name == rel.primary_table)
            .flat_map(|t| t.columns.iter())
            .find(|c| c.name == rel.primary_column)
            .map(|c| c.data_type.clone())
            .expect("loader validated relationship endpoints");

        for related in &rel.related_mappings {
            if related.relationship == RelationshipKind::Derived {
                log::debug!(
                    "Relationship '{}': {}.{} is derived; keeping its declared type",
                    rel_name,
                    related.table,
                    related.column
                );
                continue;
            }

            let column = doc
                .tables
                .iter_mut()
                .filter(|t| t.full_name == related.table)
                .flat_map(|t| t.columns.iter_mut())
                .find(|c| c.name == related.column)
                .expect("loader validated relationship endpoints");

            if column.data_type != primary_type {
                if strict {
                    return Err(EngineError::RelationshipMismatch {
                        relationship: rel_name,
                        table: related.table.clone(),
                        column: related.column.clone(),
                        expected: primary_type,
                        found: column.data_type.clone(),
                    });
                }
                log::warn!(
                    "Relationship '{}': rewriting {}.{} from '{}' to '{}' to keep \
                     synthetic values consistent",
                    rel_name,
                    related.table,
                    related.column,
                    column.data_type,
                    primary_type
                );
                column.data_type = primary_type.clone();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(strict: bool) -> MappingDocument {
        serde_json::from_str(&format!(
            r#"{{
            "Global": {{"ConnectionString": "c", "GlobalSeed": "s"}},
            "ReferentialIntegrity": {{
                "strictMode": {strict},
                "relationships": [{{
                    "name": "DriverConsistency",
                    "primaryTable": "Drivers",
                    "primaryColumn": "DriverName",
                    "relatedMappings": [
                        {{"table": "Assignments", "column": "DriverName"}}
                    ]
                }}]
            }},
            "Tables": [
                {{
                    "fullName": "Drivers",
                    "primaryKey": ["Id"],
                    "columns": [{{"name": "DriverName", "dataType": "FullName"}}]
                }},
                {{
                    "fullName": "Assignments",
                    "primaryKey": ["Id"],
                    "columns": [{{"name": "DriverName", "dataType": "FirstName"}}]
                }}
            ]
        }}"#
        ))
        .unwrap()
    }

    fn related_type(doc: &MappingDocument) -> &str {
        &doc.tables[1].columns[0].data_type
    }

    #[test]
    fn test_exact_relationship_rewrites_divergent_type() {
        let mut mapping = doc(false);
        resolve_relationships(&mut mapping).unwrap();
        assert_eq!(related_type(&mapping), "FullName");
    }

    #[test]
    fn test_strict_mode_rejects_divergent_type() {
        let mut mapping = doc(true);
        let result = resolve_relationships(&mut mapping);
        assert!(matches!(
            result,
            Err(EngineError::RelationshipMismatch { .. })
        ));
    }

    #[test]
    fn test_matching_types_pass_strict_mode() {
        let mut mapping = doc(true);
        mapping.tables[1].columns[0].data_type = "FullName".to_string();
        resolve_relationships(&mut mapping).unwrap();
        assert_eq!(related_type(&mapping), "FullName");
    }

    #[test]
    fn test_derived_relationship_keeps_declared_type() {
        let mut mapping = doc(false);
        mapping.referential_integrity.relationships[0].related_mappings[0].relationship =
            RelationshipKind::Derived;
        resolve_relationships(&mut mapping).unwrap();
        assert_eq!(related_type(&mapping), "FirstName");
    }
}
