use std::fmt::{self, Display};

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

///
/// EndPointKind
/// Real sides store the foreign key; virtual sides are derived from it.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EndPointKind {
    Real,
    Virtual,
}

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

///
/// SortedPropertyModel
/// One term of a collection sort expression, evaluated on the item objects.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SortedPropertyModel {
    pub property: &'static str,
    pub direction: SortDirection,
}

impl SortedPropertyModel {
    #[must_use]
    pub const fn asc(property: &'static str) -> Self {
        Self {
            property,
            direction: SortDirection::Ascending,
        }
    }

    #[must_use]
    pub const fn desc(property: &'static str) -> Self {
        Self {
            property,
            direction: SortDirection::Descending,
        }
    }
}

impl Display for SortedPropertyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "{} ASC", self.property),
            SortDirection::Descending => write!(f, "{} DESC", self.property),
        }
    }
}

///
/// EndPointModel
/// One side of a relation: the owning class and the property on it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EndPointModel {
    pub class: &'static str,
    pub property: &'static str,
    pub kind: EndPointKind,
    pub cardinality: Cardinality,

    /// Sort expression for collection sides; empty keeps storage order.
    pub sort: &'static [SortedPropertyModel],
}

impl EndPointModel {
    /// Foreign-key side; always points at one opposite object.
    #[must_use]
    pub const fn real(class: &'static str, property: &'static str) -> Self {
        Self {
            class,
            property,
            kind: EndPointKind::Real,
            cardinality: Cardinality::One,
            sort: &[],
        }
    }

    /// Virtual side of a 1:1 relation.
    #[must_use]
    pub const fn virtual_object(class: &'static str, property: &'static str) -> Self {
        Self {
            class,
            property,
            kind: EndPointKind::Virtual,
            cardinality: Cardinality::One,
            sort: &[],
        }
    }

    /// Virtual side of a 1:n relation.
    #[must_use]
    pub const fn collection(
        class: &'static str,
        property: &'static str,
        sort: &'static [SortedPropertyModel],
    ) -> Self {
        Self {
            class,
            property,
            kind: EndPointKind::Virtual,
            cardinality: Cardinality::Many,
            sort,
        }
    }
}

///
/// RelationModel
/// A bidirectional relation: exactly one real and one virtual side.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelationModel {
    pub name: &'static str,
    pub end_points: [EndPointModel; 2],
}

impl RelationModel {
    #[must_use]
    pub const fn new(name: &'static str, first: EndPointModel, second: EndPointModel) -> Self {
        Self {
            name,
            end_points: [first, second],
        }
    }
}

impl Display for RelationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = &self.end_points;

        write!(
            f,
            "{} ({}.{} <-> {}.{})",
            self.name, a.class, a.property, b.class, b.property
        )
    }
}
