use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::relation::{
        Cardinality, EndPointKind, EndPointModel, RelationModel, SortedPropertyModel,
    },
};
use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};
use thiserror::Error as ThisError;

///
/// MappingError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum MappingError {
    #[error("relation '{relation}' must have exactly one real side, found {count}")]
    RealSideCount { relation: &'static str, count: usize },

    #[error("real end-point '{class}.{property}' of relation '{relation}' must have cardinality one")]
    RealSideMany {
        relation: &'static str,
        class: &'static str,
        property: &'static str,
    },

    #[error("end-point '{class}.{property}' of relation '{relation}' declares a sort expression but is not a collection")]
    SortOnNonCollection {
        relation: &'static str,
        class: &'static str,
        property: &'static str,
    },

    #[error("relation property '{class}.{property}' is mapped more than once")]
    DuplicateProperty {
        class: &'static str,
        property: &'static str,
    },
}

impl From<MappingError> for InternalError {
    fn from(err: MappingError) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Mapping, err.to_string())
    }
}

///
/// MappingConfiguration
///
/// The set of bidirectional relations known to a transaction.
///

#[derive(Clone, Copy, Debug)]
pub struct MappingConfiguration {
    relations: &'static [RelationModel],
}

impl MappingConfiguration {
    #[must_use]
    pub const fn new(relations: &'static [RelationModel]) -> Self {
        Self { relations }
    }

    #[must_use]
    pub const fn relations(&self) -> &'static [RelationModel] {
        self.relations
    }

    /// Reject malformed relations before any transaction uses them.
    pub fn validate(&self) -> Result<(), MappingError> {
        let mut seen = BTreeSet::new();

        for relation in self.relations {
            let count = relation
                .end_points
                .iter()
                .filter(|ep| ep.kind == EndPointKind::Real)
                .count();
            if count != 1 {
                return Err(MappingError::RealSideCount {
                    relation: relation.name,
                    count,
                });
            }

            for ep in &relation.end_points {
                if ep.kind == EndPointKind::Real && ep.cardinality == Cardinality::Many {
                    return Err(MappingError::RealSideMany {
                        relation: relation.name,
                        class: ep.class,
                        property: ep.property,
                    });
                }
                if !ep.sort.is_empty() && ep.cardinality != Cardinality::Many {
                    return Err(MappingError::SortOnNonCollection {
                        relation: relation.name,
                        class: ep.class,
                        property: ep.property,
                    });
                }
                if !seen.insert((ep.class, ep.property)) {
                    return Err(MappingError::DuplicateProperty {
                        class: ep.class,
                        property: ep.property,
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolve one relation property.
    pub fn end_point_definition(
        &self,
        class: &str,
        property: &str,
    ) -> Result<RelationEndPointDefinition, InternalError> {
        self.end_point_definitions(class)
            .find(|def| def.property() == property)
            .ok_or_else(|| {
                InternalError::not_found(
                    ErrorOrigin::Mapping,
                    format!("'{class}.{property}' is not a mapped relation property"),
                )
            })
    }

    /// All relation properties declared on a class, in declaration order.
    pub fn end_point_definitions<'a>(
        &self,
        class: &'a str,
    ) -> impl Iterator<Item = RelationEndPointDefinition> + use<'a> {
        let relations = self.relations;

        relations.iter().flat_map(move |relation| {
            (0..2)
                .map(move |side| RelationEndPointDefinition { relation, side })
                .filter(move |def| def.class() == class)
        })
    }
}

///
/// RelationEndPointDefinition
///
/// One resolved side of a relation. Identity is the `(class, property)` pair.
///

#[derive(Clone, Copy, Debug)]
pub struct RelationEndPointDefinition {
    relation: &'static RelationModel,
    side: usize,
}

impl RelationEndPointDefinition {
    #[must_use]
    pub const fn relation(&self) -> &'static RelationModel {
        self.relation
    }

    #[must_use]
    pub const fn model(&self) -> &'static EndPointModel {
        &self.relation.end_points[self.side]
    }

    #[must_use]
    pub const fn opposite(&self) -> Self {
        Self {
            relation: self.relation,
            side: 1 - self.side,
        }
    }

    #[must_use]
    pub const fn class(&self) -> &'static str {
        self.model().class
    }

    #[must_use]
    pub const fn property(&self) -> &'static str {
        self.model().property
    }

    #[must_use]
    pub const fn kind(&self) -> EndPointKind {
        self.model().kind
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.model().cardinality
    }

    #[must_use]
    pub const fn sort(&self) -> &'static [SortedPropertyModel] {
        self.model().sort
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self.kind(), EndPointKind::Virtual)
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.cardinality(), Cardinality::Many)
    }

    /// `Class.Property`, used in messages and metrics keys.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for RelationEndPointDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.class() == other.class() && self.property() == other.property()
    }
}

impl Eq for RelationEndPointDefinition {}

impl Hash for RelationEndPointDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class().hash(state);
        self.property().hash(state);
    }
}

impl Ord for RelationEndPointDefinition {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.class(), self.property()).cmp(&(other.class(), other.property()))
    }
}

impl PartialOrd for RelationEndPointDefinition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for RelationEndPointDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class(), self.property())
    }
}

///
/// TESTS
///
