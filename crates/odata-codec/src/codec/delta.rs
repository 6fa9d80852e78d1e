//! Delta assembly: validate every record, then fix the emission order.

use crate::error::EncodeError;
use crate::model::{DeletedReason, Delta, DeltaLink, Entity};

/// One record of an emitted delta, borrowing from the source [`Delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaRecord<'d> {
    Entity(&'d Entity),
    Deleted {
        id: &'d str,
        reason: DeletedReason,
    },
    AddedLink(LinkRecord<'d>),
    DeletedLink(LinkRecord<'d>),
}

/// A validated link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRecord<'d> {
    pub source: &'d str,
    pub relationship: &'d str,
    pub target: &'d str,
}

fn required<'d>(
    value: &'d Option<String>,
    record: &'static str,
    field: &'static str,
) -> Result<&'d str, EncodeError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EncodeError::MissingRequiredField { record, field }),
    }
}

fn link_record<'d>(link: &'d DeltaLink, record: &'static str) -> Result<LinkRecord<'d>, EncodeError> {
    Ok(LinkRecord {
        source: required(&link.source, record, "source")?,
        relationship: required(&link.relationship, record, "relationship")?,
        target: required(&link.target, record, "target")?,
    })
}

/// Validates `delta` and returns its records in emission order: changed or
/// added entities, deleted entities, added links, deleted links.
///
/// Validation covers every record before anything is returned, so a
/// serializer never starts writing a delta it cannot finish.
pub fn assemble(delta: &Delta) -> Result<Vec<DeltaRecord<'_>>, EncodeError> {
    let mut records = Vec::with_capacity(
        delta.entities.len()
            + delta.deleted_entities.len()
            + delta.added_links.len()
            + delta.deleted_links.len(),
    );

    records.extend(delta.entities.iter().map(DeltaRecord::Entity));

    for deleted in &delta.deleted_entities {
        records.push(DeltaRecord::Deleted {
            id: required(&deleted.id, "deleted entity", "id")?,
            reason: deleted.reason,
        });
    }
    for link in &delta.added_links {
        records.push(DeltaRecord::AddedLink(link_record(link, "added link")?));
    }
    for link in &delta.deleted_links {
        records.push(DeltaRecord::DeletedLink(link_record(link, "deleted link")?));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::model::{DeletedEntity, DeltaBuilder, EntityBuilder};

    #[test]
    fn test_fixed_order() {
        // Built in reverse order on purpose.
        let delta = DeltaBuilder::new()
            .deleted_link("A", "Friends", "X")
            .added_link("A", "Friends", "C")
            .deleted("B", DeletedReason::Deleted)
            .entity(EntityBuilder::new().id("A").build())
            .build();

        let records = assemble(&delta).unwrap();
        assert!(matches!(records[0], DeltaRecord::Entity(_)));
        assert!(matches!(records[1], DeltaRecord::Deleted { id: "B", .. }));
        assert!(matches!(records[2], DeltaRecord::AddedLink(_)));
        assert!(matches!(records[3], DeltaRecord::DeletedLink(_)));
    }

    #[test]
    fn test_missing_relationship_fails() {
        let mut delta = Delta::new();
        delta.added_links.push(DeltaLink {
            source: Some("A".to_string()),
            relationship: None,
            target: Some("B".to_string()),
        });
        let err = assemble(&delta).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingRequiredField);
        assert_eq!(
            err,
            EncodeError::MissingRequiredField {
                record: "added link",
                field: "relationship"
            }
        );
    }

    #[test]
    fn test_deleted_entity_requires_id() {
        let mut delta = Delta::new();
        delta.deleted_entities.push(DeletedEntity::default());
        assert!(matches!(
            assemble(&delta),
            Err(EncodeError::MissingRequiredField { field: "id", .. })
        ));
    }

    #[test]
    fn test_empty_delta_has_no_records() {
        assert!(assemble(&Delta::new()).unwrap().is_empty());
    }
}
