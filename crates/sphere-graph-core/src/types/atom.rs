//! Atoms: immutable semantic units bound to Unicode code points.

use serde::{Deserialize, Serialize};

use super::physicality::Physicality;
use crate::error::{CoreError, CoreResult};

/// One atom per Unicode scalar value.
///
/// Atoms are created only during the one-time seeding pass, never updated,
/// never deleted. They are owned exclusively by the
/// [`AtomStore`](crate::atoms::AtomStore); everything else references them
/// by code point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// The Unicode scalar value.
    pub codepoint: u32,
    /// Permanent position on S³.
    pub physicality: Physicality,
}

impl Atom {
    /// Create an atom, rejecting surrogates and out-of-range values.
    pub fn new(codepoint: u32, physicality: Physicality) -> CoreResult<Self> {
        validate_scalar(codepoint)?;
        Ok(Self {
            codepoint,
            physicality,
        })
    }

    /// The atom's code point as a `char`.
    ///
    /// Infallible for atoms built through [`Atom::new`], which admits only
    /// scalar values.
    pub fn to_char(&self) -> char {
        char::from_u32(self.codepoint).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

/// Reject values that are not Unicode scalar values.
pub fn validate_scalar(codepoint: u32) -> CoreResult<()> {
    if char::from_u32(codepoint).is_none() {
        return Err(CoreError::MalformedCodePoint { codepoint });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_physicality() -> Physicality {
        Physicality::new([0.0, 0.0, 0.0, 1.0], 0)
    }

    #[test]
    fn test_atom_for_letter() {
        let atom = Atom::new(u32::from('h'), unit_physicality()).unwrap();
        assert_eq!(atom.to_char(), 'h');
    }

    #[test]
    fn test_surrogate_rejected() {
        let err = Atom::new(0xD800, unit_physicality()).unwrap_err();
        assert!(matches!(err, CoreError::MalformedCodePoint { codepoint: 0xD800 }));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(validate_scalar(0x110000).is_err());
        assert!(validate_scalar(0x10FFFF).is_ok());
    }
}
