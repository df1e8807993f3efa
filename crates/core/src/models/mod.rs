//! NICU record types.
//!
//! Each record type comes in two shapes:
//! - `*Data`: the typed, validated field set accepted on create/update
//! - the stored record (`Patient`, `Entry`): `*Data` plus the surrogate `id`
//!
//! Stored records serialise to the JSON wire form directly; `*Data` is flattened
//! into them so the wire form stays a single flat object per record.

pub mod entry;
pub mod patient;

pub use entry::{Entry, EntryData, ModeOfFeeding, TypeOfMilk};
pub use patient::{GrowthCategory, Patient, PatientData, PatientRecord, Sex};

/// A closed set of values exchanged as fixed strings on the wire and in storage.
pub trait Choice: Copy + Sized + 'static {
    /// Every variant, in display order.
    const ALL: &'static [Self];

    /// Wire/storage string for this variant.
    fn as_str(self) -> &'static str;

    /// Parse from the wire/storage string. Matching is exact.
    fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}
