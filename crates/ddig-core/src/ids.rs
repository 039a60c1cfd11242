use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable ids of the form `PREFIX-YYYYMMDD-N...N`.
///
/// The numeric suffix is random; uniqueness within a category is enforced by
/// the record store, which rejects duplicates so the caller can draw again.
macro_rules! dated_id {
    ($name:ident, $prefix:expr, $digits:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;
            pub const DIGITS: u32 = $digits;

            /// Draw a fresh id for `date`.
            pub fn generate<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> Self {
                let low = 10u32.pow(Self::DIGITS - 1);
                let high = 10u32.pow(Self::DIGITS);
                let n = rng.gen_range(low..high);
                Self(format!("{}-{}-{}", Self::PREFIX, date.format("%Y%m%d"), n))
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when `s` has the exact `PREFIX-YYYYMMDD-N` shape.
            pub fn is_well_formed(s: &str) -> bool {
                let mut parts = s.splitn(3, '-');
                let (Some(prefix), Some(date), Some(suffix)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    return false;
                };
                prefix == Self::PREFIX
                    && date.len() == 8
                    && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
                    && suffix.len() == Self::DIGITS as usize
                    && suffix.bytes().all(|b| b.is_ascii_digit())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

dated_id!(RegistrationId, "DDIG", 4);
dated_id!(InquiryId, "INQ", 3);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 25).unwrap()
    }

    #[test]
    fn registration_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let id = RegistrationId::generate(date(), &mut rng);
            assert!(id.as_str().starts_with("DDIG-20250325-"), "got: {id}");
            assert!(RegistrationId::is_well_formed(id.as_str()), "got: {id}");
        }
    }

    #[test]
    fn inquiry_id_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let id = InquiryId::generate(date(), &mut rng);
            assert!(id.as_str().starts_with("INQ-20250325-"), "got: {id}");
            assert_eq!(id.as_str().len(), "INQ-20250325-123".len());
            assert!(InquiryId::is_well_formed(id.as_str()));
        }
    }

    #[test]
    fn well_formed_rejects_wrong_shapes() {
        assert!(!RegistrationId::is_well_formed("DDIG-20250325-123"));
        assert!(!RegistrationId::is_well_formed("INQ-20250325-1234"));
        assert!(!RegistrationId::is_well_formed("DDIG-2025032-1234"));
        assert!(!RegistrationId::is_well_formed("DDIG-20251345-1234"));
        assert!(!RegistrationId::is_well_formed("DDIG-20250325-12a4"));
        assert!(!InquiryId::is_well_formed("INQ-20250325"));
    }

    #[test]
    fn serializes_transparently() {
        let id = InquiryId::from_raw("INQ-20250325-512");
        assert_eq!(serde_json::to_value(&id).unwrap(), "INQ-20250325-512");
    }
}
