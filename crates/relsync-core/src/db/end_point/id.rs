use crate::{
    error::InternalError,
    model::{MappingConfiguration, RelationEndPointDefinition},
    types::ObjectId,
};
use derive_more::Display;
use serde::{Serialize, Serializer};

///
/// RelationEndPointId
///
/// Identifies one side of one relation for one object.
/// Immutable and compared by value; the real/virtual marker comes from the
/// property definition.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{object}/{definition}")]
pub struct RelationEndPointId {
    object: ObjectId,
    definition: RelationEndPointDefinition,
}

impl RelationEndPointId {
    #[must_use]
    pub const fn new(object: ObjectId, definition: RelationEndPointDefinition) -> Self {
        Self { object, definition }
    }

    /// Resolve `property` on the object's class through the mapping.
    pub fn resolve(
        mapping: &MappingConfiguration,
        object: ObjectId,
        property: &str,
    ) -> Result<Self, InternalError> {
        let definition = mapping.end_point_definition(object.class(), property)?;

        Ok(Self::new(object, definition))
    }

    #[must_use]
    pub const fn object(&self) -> ObjectId {
        self.object
    }

    #[must_use]
    pub const fn definition(&self) -> RelationEndPointDefinition {
        self.definition
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.definition.is_virtual()
    }

    /// The end-point on the other side of the relation, owned by `opposite`.
    #[must_use]
    pub const fn opposite_for(&self, opposite: ObjectId) -> Self {
        Self::new(opposite, self.definition.opposite())
    }
}

impl Serialize for RelationEndPointId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
