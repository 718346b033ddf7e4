//! Reverse-geocode candidate extraction

use contracts::{GeocodeCandidate, POSTAL_CODE_TYPE};

/// Formatted address of the first candidate, empty when there is none
pub fn first_formatted_address(candidates: &[GeocodeCandidate]) -> String {
    candidates
        .first()
        .map(|c| c.formatted_address.clone())
        .unwrap_or_default()
}

/// Long name of the first `postal_code` component across all candidates
///
/// Candidates and their components are scanned in order; only the primary
/// (first) type tag of a component counts.
pub fn postal_code(candidates: &[GeocodeCandidate]) -> String {
    candidates
        .iter()
        .flat_map(|c| c.address_components.iter())
        .find(|component| component.primary_type() == Some(POSTAL_CODE_TYPE))
        .map(|component| component.long_name.clone())
        .unwrap_or_default()
}
