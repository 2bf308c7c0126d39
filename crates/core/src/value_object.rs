//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// To "modify" one, build a new one. Computed invoice totals and formatter
/// table rows are value objects; invoices and clients are not.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
