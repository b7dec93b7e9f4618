//! Personal-details field matcher
//!
//! Categories are matched against each field's haystack (name, id,
//! placeholder, aria-label and label text) by case-insensitive substring.
//! Tie-break: categories are processed in [`FieldCategory::ORDER`]; each takes
//! the first unclaimed field in document order containing any of its keys, and
//! a field is claimed by at most one category.

use serde::{Deserialize, Serialize};
use slotwatch_core_types::Participant;

use crate::types::{normalize, FormField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Phone,
    GivenName,
    FamilyName,
    DateOfBirth,
    PlaceOfBirth,
    County,
    PostalCode,
}

impl FieldCategory {
    /// Matching order. Date of birth precedes place of birth so that a
    /// "date of birth" input is never claimed by the place category.
    pub const ORDER: [FieldCategory; 7] = [
        FieldCategory::Phone,
        FieldCategory::GivenName,
        FieldCategory::FamilyName,
        FieldCategory::DateOfBirth,
        FieldCategory::PlaceOfBirth,
        FieldCategory::County,
        FieldCategory::PostalCode,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FieldCategory::Phone => "phone",
            FieldCategory::GivenName => "given-name",
            FieldCategory::FamilyName => "family-name",
            FieldCategory::DateOfBirth => "date-of-birth",
            FieldCategory::PlaceOfBirth => "place-of-birth",
            FieldCategory::County => "county",
            FieldCategory::PostalCode => "postal-code",
        }
    }

    pub fn default_keys(&self) -> &'static [&'static str] {
        match self {
            FieldCategory::Phone => &["phone", "mobile", "tel"],
            FieldCategory::GivenName => &["first", "given"],
            FieldCategory::FamilyName => &["sur", "last", "family"],
            FieldCategory::DateOfBirth => &["dob", "date"],
            FieldCategory::PlaceOfBirth => &["place", "birth"],
            FieldCategory::County => &["county", "region"],
            FieldCategory::PostalCode => &["zip", "post"],
        }
    }

    pub fn value_of<'a>(&self, participant: &'a Participant) -> &'a str {
        match self {
            FieldCategory::Phone => &participant.phone,
            FieldCategory::GivenName => &participant.first_name,
            FieldCategory::FamilyName => &participant.surname,
            FieldCategory::DateOfBirth => &participant.dob,
            FieldCategory::PlaceOfBirth => &participant.place_of_birth,
            FieldCategory::County => &participant.county,
            FieldCategory::PostalCode => &participant.zip_code,
        }
    }
}

/// One category to fill: its key fragments and the participant's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub category: FieldCategory,
    pub keys: Vec<String>,
    pub value: String,
}

impl FieldEntry {
    /// Entries for every category with a non-empty value, using default keys.
    pub fn for_participant(participant: &Participant) -> Vec<FieldEntry> {
        Self::with_keys(participant, |category| {
            category
                .default_keys()
                .iter()
                .map(|k| k.to_string())
                .collect()
        })
    }

    /// Entries for every category with a non-empty value, keys supplied by `keys`.
    pub fn with_keys<F>(participant: &Participant, mut keys: F) -> Vec<FieldEntry>
    where
        F: FnMut(FieldCategory) -> Vec<String>,
    {
        FieldCategory::ORDER
            .iter()
            .filter_map(|category| {
                let value = category.value_of(participant).trim();
                if value.is_empty() {
                    return None;
                }
                Some(FieldEntry {
                    category: *category,
                    keys: keys(*category).iter().map(|k| normalize(k)).collect(),
                    value: value.to_string(),
                })
            })
            .collect()
    }
}

/// Assign fields to entries; the result follows entry order.
pub fn match_fields<'a>(
    fields: &'a [FormField],
    entries: &'a [FieldEntry],
) -> Vec<(&'a FormField, &'a FieldEntry)> {
    let haystacks: Vec<String> = fields.iter().map(FormField::haystack).collect();
    let mut claimed = vec![false; fields.len()];
    let mut assignments = Vec::new();

    for entry in entries {
        let hit = haystacks.iter().enumerate().find(|(idx, hay)| {
            !claimed[*idx]
                && entry
                    .keys
                    .iter()
                    .any(|key| !key.is_empty() && hay.contains(key.as_str()))
        });
        if let Some((idx, _)) = hit {
            claimed[idx] = true;
            assignments.push((&fields[idx], entry));
        }
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(index: usize, name: &str, label: &str) -> FormField {
        FormField {
            index,
            tag: "input".into(),
            name: name.into(),
            label: label.into(),
            selector: format!("#f{index}"),
            ..Default::default()
        }
    }

    fn participant() -> Participant {
        Participant {
            email: "a@example.com".into(),
            phone: "+254700000000".into(),
            first_name: "Amani".into(),
            surname: "Otieno".into(),
            dob: "2000-01-01".into(),
            place_of_birth: "Nairobi".into(),
            zip_code: "00100".into(),
            ..Default::default()
        }
    }

    #[test]
    fn date_of_birth_is_not_taken_by_place_of_birth() {
        let fields = vec![
            field(0, "dateOfBirth", "Date of birth"),
            field(1, "placeOfBirth", "Place of birth"),
        ];
        let entries = FieldEntry::for_participant(&participant());
        let assigned = match_fields(&fields, &entries);

        let dob = assigned
            .iter()
            .find(|(_, e)| e.category == FieldCategory::DateOfBirth)
            .unwrap();
        assert_eq!(dob.0.index, 0);
        let place = assigned
            .iter()
            .find(|(_, e)| e.category == FieldCategory::PlaceOfBirth)
            .unwrap();
        assert_eq!(place.0.index, 1);
    }

    #[test]
    fn ties_resolve_to_first_field_in_document_order() {
        let fields = vec![
            field(0, "first_name", ""),
            field(1, "firstname_confirm", ""),
        ];
        let entries = FieldEntry::for_participant(&participant());
        let assigned = match_fields(&fields, &entries);
        let given: Vec<_> = assigned
            .iter()
            .filter(|(_, e)| e.category == FieldCategory::GivenName)
            .collect();
        assert_eq!(given.len(), 1);
        assert_eq!(given[0].0.index, 0);
    }

    #[test]
    fn a_field_is_claimed_once() {
        // "postcode_phone" matches both phone and postal keys; phone is first.
        let fields = vec![field(0, "postcode_phone", "")];
        let entries = FieldEntry::for_participant(&participant());
        let assigned = match_fields(&fields, &entries);
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].1.category, FieldCategory::Phone);
    }

    #[test]
    fn empty_values_are_skipped() {
        let entries = FieldEntry::for_participant(&participant());
        assert!(entries.iter().all(|e| e.category != FieldCategory::County));
    }
}
