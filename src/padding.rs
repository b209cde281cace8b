//! Filament slot padding
//!
//! The destination printer always expects exactly [`MAX_FILAMENTS`] slots.

use crate::error::{Error, Result};
use crate::model::{FilamentList, FilamentSlot, MAX_FILAMENTS};
use tracing::debug;

/// Pad a filament list to exactly [`MAX_FILAMENTS`] slots
///
/// Missing slots become white PLA placeholders using `placeholder_profile`.
/// A full list is returned unchanged, so padding twice equals padding once.
///
/// # Errors
///
/// - [`Error::TooManyFilaments`] when the list is longer than the printer
///   has slots
/// - [`Error::Internal`] for an empty list, which parsing never produces
pub fn pad_filaments(filaments: FilamentList, placeholder_profile: &str) -> Result<FilamentList> {
    let count = filaments.len();
    if count == 0 {
        return Err(Error::internal("Cannot pad an empty filament list"));
    }
    if count > MAX_FILAMENTS {
        return Err(Error::TooManyFilaments {
            count,
            max: MAX_FILAMENTS,
        });
    }
    if count == MAX_FILAMENTS {
        return Ok(filaments);
    }

    let mut slots = filaments.into_slots();
    slots.extend((count..MAX_FILAMENTS).map(|index| FilamentSlot::placeholder(index, placeholder_profile)));
    debug!(declared = count, padded = MAX_FILAMENTS - count, "padded filament list");

    Ok(FilamentList::new(slots))
}
