//! Per-type format generators.
//!
//! Each generator draws every sub-value from the caller's [`SeedStream`],
//! so the produced value is a pure function of the stream's starting state.
//! Check-digit types (CreditCard, BusinessABN, BusinessACN) always emit
//! checksum-valid values.

use super::data_type::DataType;
use super::pools;
use super::seed::SeedStream;
use crate::config::Locale;
use chrono::{Duration, NaiveDate};

/// Generate a format-plausible value for a base type.
///
/// `target_len` is a hint used by length-preserving callers; only types
/// with a naturally variable length honor it (CreditCard digit count,
/// plain text runs). Fixed-format types ignore it; whether their output
/// may be padded or truncated afterwards is decided by
/// [`resists_length_adjustment`].
pub fn generate_base(
    base: DataType,
    stream: &mut SeedStream,
    locale: Locale,
    target_len: Option<usize>,
) -> String {
    match base {
        DataType::FirstName => (*stream.pick(pools::FIRST_NAMES)).to_string(),
        DataType::LastName => (*stream.pick(pools::LAST_NAMES)).to_string(),
        DataType::FullName => {
            let first = *stream.pick(pools::FIRST_NAMES);
            let last = *stream.pick(pools::LAST_NAMES);
            format!("{} {}", first, last)
        }
        DataType::Email => {
            let first = stream.pick(pools::FIRST_NAMES).to_lowercase();
            let last = stream.pick(pools::LAST_NAMES).to_lowercase();
            let last: String = last.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
            let number = stream.digits(2);
            let domain = *stream.pick(pools::EMAIL_DOMAINS);
            format!("{}.{}{}@{}", first, last, number, domain)
        }
        DataType::Phone => match locale {
            Locale::AU => {
                let area = *stream.pick(&['2', '3', '4', '7', '8']);
                format!("0{}{}", area, stream.digits(8))
            }
            Locale::UK => format!("07{}", stream.digits(9)),
        },
        DataType::AddressLine1 => {
            let number = stream.next_in_range(1, 399);
            let name = *stream.pick(pools::STREET_NAMES);
            let kind = *stream.pick(pools::STREET_TYPES);
            format!("{} {} {}", number, name, kind)
        }
        DataType::AddressLine2 => {
            let kind = *stream.pick(pools::UNIT_TYPES);
            format!("{} {}", kind, stream.next_in_range(1, 99))
        }
        DataType::FullAddress => {
            let line1 = generate_base(DataType::AddressLine1, stream, locale, None);
            let city = *stream.pick(pools::CITIES);
            let state = *stream.pick(pools::STATE_ABBRS);
            let postcode = generate_base(DataType::PostCode, stream, locale, None);
            format!("{}, {} {} {}", line1, city, state, postcode)
        }
        DataType::City => (*stream.pick(pools::CITIES)).to_string(),
        DataType::State => (*stream.pick(pools::STATES)).to_string(),
        DataType::StateAbbr => (*stream.pick(pools::STATE_ABBRS)).to_string(),
        DataType::PostCode => {
            format!("{}{}", stream.next_in_range(2, 7), stream.digits(3))
        }
        DataType::Country => (*stream.pick(pools::COUNTRIES)).to_string(),
        DataType::UkPostcode => {
            let area = *stream.pick(pools::UK_POSTCODE_AREAS);
            let district = stream.next_in_range(1, 9);
            format!("{}{} {}{}", area, district, stream.next_in_range(1, 9), stream.letters(2))
        }
        DataType::CreditCard => {
            let len = target_len.unwrap_or(16).clamp(12, 19);
            let first = *stream.pick(&['4', '5']);
            let mut digits = String::with_capacity(len);
            digits.push(first);
            digits.push_str(&stream.digits(len - 2));
            digits.push(luhn_check_digit(&digits));
            digits
        }
        DataType::Nino => {
            let prefix = *stream.pick(pools::NINO_PREFIXES);
            let suffix = *stream.pick(&['A', 'B', 'C', 'D']);
            format!("{}{}{}", prefix, stream.digits(6), suffix)
        }
        DataType::SortCode => {
            format!("{}-{}-{}", stream.digits(2), stream.digits(2), stream.digits(2))
        }
        DataType::LicenseNumber => format!("{}{}", stream.letters(2), stream.digits(6)),
        DataType::CompanyName => {
            let word = *stream.pick(pools::COMPANY_WORDS);
            let activity = *stream.pick(pools::COMPANY_ACTIVITIES);
            let suffix = *stream.pick(pools::COMPANY_SUFFIXES);
            format!("{} {} {}", word, activity, suffix)
        }
        DataType::BusinessAbn => generate_abn(stream),
        DataType::BusinessAcn => generate_acn(stream),
        DataType::VehicleRegistration => {
            format!("{}{}", stream.letters(3), stream.digits(3))
        }
        DataType::VinNumber => stream.from_alphabet(pools::VIN_ALPHABET, 17),
        DataType::VehicleMakeModel => (*stream.pick(pools::VEHICLE_MAKE_MODELS)).to_string(),
        DataType::EngineNumber => format!("{}{}", stream.letters(2), stream.digits(8)),
        DataType::GpsCoordinate => {
            // Mainland Australia bounding box, micro-degree resolution.
            let lat = -43.8 + stream.next_below(33_300_001) as f64 / 1_000_000.0;
            let lon = 113.1 + stream.next_below(40_800_001) as f64 / 1_000_000.0;
            format!("{:.6},{:.6}", lat, lon)
        }
        DataType::RouteCode => format!("{}-{}", stream.letters(2), stream.digits(3)),
        DataType::DepotLocation => {
            let city = *stream.pick(pools::CITIES);
            let kind = *stream.pick(pools::DEPOT_KINDS);
            format!("{} {}", city, kind)
        }
        DataType::Date => date_in_range(stream, (1970, 1, 1), (2029, 12, 31)),
        DataType::DateOfBirth => date_in_range(stream, (1930, 1, 1), (2004, 12, 31)),
    }
}

/// Whether a type's output resists length adjustment.
///
/// These formats carry a check digit or a rigid pattern; padding or
/// truncating the finished value would invalidate them. Length
/// preservation for these types retries at the target length and
/// otherwise keeps the natural format-valid output.
pub fn resists_length_adjustment(base: DataType) -> bool {
    matches!(
        base,
        DataType::CreditCard
            | DataType::BusinessAbn
            | DataType::BusinessAcn
            | DataType::Nino
            | DataType::SortCode
            | DataType::UkPostcode
            | DataType::LicenseNumber
            | DataType::VehicleRegistration
            | DataType::VinNumber
            | DataType::EngineNumber
            | DataType::GpsCoordinate
            | DataType::Phone
            | DataType::PostCode
            | DataType::Date
            | DataType::DateOfBirth
    )
}

/// Day-level deterministic date within an inclusive range.
fn date_in_range(stream: &mut SeedStream, low: (i32, u32, u32), high: (i32, u32, u32)) -> String {
    let start = NaiveDate::from_ymd_opt(low.0, low.1, low.2).expect("valid range start");
    let end = NaiveDate::from_ymd_opt(high.0, high.1, high.2).expect("valid range end");
    let span = (end - start).num_days() as u64 + 1;
    let date = start + Duration::days(stream.next_below(span) as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Luhn check digit for a digit string.
pub fn luhn_check_digit(digits: &str) -> char {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    let check = (10 - (sum % 10)) % 10;
    (b'0' + check as u8) as char
}

/// Verify a full digit string against the Luhn algorithm.
pub fn luhn_is_valid(digits: &str) -> bool {
    if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (body, check) = digits.split_at(digits.len() - 1);
    luhn_check_digit(body) == check.chars().next().unwrap()
}

const ABN_WEIGHTS: [u64; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];

/// Generate an ABN with a valid checksum.
///
/// Nine tail digits come from the stream; the two leading digits are then
/// searched (from a stream-derived starting point, wrapping) for the first
/// pair that satisfies the modulus-89 rule. The search is bounded: for any
/// fixed tail at least one valid leading pair in 10..=99 exists.
fn generate_abn(stream: &mut SeedStream) -> String {
    let tail = stream.digits(9);
    let start = 10 + stream.next_below(90);

    for offset in 0..90 {
        let lead = 10 + (start - 10 + offset) % 90;
        let candidate = format!("{:02}{}", lead, tail);
        if abn_is_valid(&candidate) {
            return candidate;
        }
    }

    // Unreachable for any 9-digit tail; keep a well-formed fallback.
    format!("51{}", tail)
}

/// Verify an 11-digit ABN checksum.
pub fn abn_is_valid(abn: &str) -> bool {
    if abn.len() != 11 || !abn.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if abn.as_bytes()[0] == b'0' {
        return false;
    }
    let sum: u64 = abn
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let mut d = (b - b'0') as u64;
            if i == 0 {
                d -= 1;
            }
            d * ABN_WEIGHTS[i]
        })
        .sum();
    sum % 89 == 0
}

const ACN_WEIGHTS: [u32; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

/// Generate an ACN with a valid check digit.
fn generate_acn(stream: &mut SeedStream) -> String {
    let body = stream.digits(8);
    let sum: u32 = body
        .bytes()
        .zip(ACN_WEIGHTS)
        .map(|(b, w)| (b - b'0') as u32 * w)
        .sum();
    let complement = (10 - sum % 10) % 10;
    format!("{}{}", body, complement)
}

/// Verify a 9-digit ACN check digit.
pub fn acn_is_valid(acn: &str) -> bool {
    if acn.len() != 9 || !acn.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = acn
        .bytes()
        .take(8)
        .zip(ACN_WEIGHTS)
        .map(|(b, w)| (b - b'0') as u32 * w)
        .sum();
    let complement = (10 - sum % 10) % 10;
    complement == (acn.as_bytes()[8] - b'0') as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;

    fn stream(n: u64) -> SeedStream {
        SeedStream::new(n)
    }

    #[test]
    fn test_luhn_known_values() {
        // 4539 1488 0343 6467 is a classic valid test number.
        assert!(luhn_is_valid("4539148803436467"));
        assert!(!luhn_is_valid("4539148803436468"));
        assert_eq!(luhn_check_digit("453914880343646"), '7');
    }

    #[test]
    fn test_credit_cards_pass_luhn() {
        for seed in 0..200 {
            let card = generate_base(DataType::CreditCard, &mut stream(seed), Locale::AU, None);
            assert_eq!(card.len(), 16);
            assert!(luhn_is_valid(&card), "{card}");
        }
    }

    #[test]
    fn test_credit_card_honors_target_length() {
        let card = generate_base(DataType::CreditCard, &mut stream(9), Locale::AU, Some(19));
        assert_eq!(card.len(), 19);
        assert!(luhn_is_valid(&card));
    }

    #[test]
    fn test_length_rigid_types_are_classified() {
        assert!(resists_length_adjustment(DataType::BusinessAbn));
        assert!(resists_length_adjustment(DataType::CreditCard));
        assert!(resists_length_adjustment(DataType::Nino));
        assert!(resists_length_adjustment(DataType::UkPostcode));
        assert!(!resists_length_adjustment(DataType::FirstName));
        assert!(!resists_length_adjustment(DataType::AddressLine1));
        assert!(!resists_length_adjustment(DataType::CompanyName));
    }

    #[test]
    fn test_abn_known_value() {
        // The ATO's published example ABN.
        assert!(abn_is_valid("51824753556"));
        assert!(!abn_is_valid("51824753557"));
    }

    #[test]
    fn test_generated_abns_validate() {
        for seed in 0..200 {
            let abn = generate_base(DataType::BusinessAbn, &mut stream(seed), Locale::AU, None);
            assert_eq!(abn.len(), 11);
            assert!(abn_is_valid(&abn), "{abn}");
        }
    }

    #[test]
    fn test_acn_known_value() {
        // ASIC's published example ACN.
        assert!(acn_is_valid("004085616"));
        assert!(!acn_is_valid("004085617"));
    }

    #[test]
    fn test_generated_acns_validate() {
        for seed in 0..200 {
            let acn = generate_base(DataType::BusinessAcn, &mut stream(seed), Locale::AU, None);
            assert!(acn_is_valid(&acn), "{acn}");
        }
    }

    #[test]
    fn test_email_shape() {
        static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
        });
        for seed in 0..100 {
            let email = generate_base(DataType::Email, &mut stream(seed), Locale::AU, None);
            assert!(EMAIL_RE.is_match(&email), "{email}");
        }
    }

    #[test]
    fn test_phone_shapes() {
        static AU_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\+61|0)[2-478]\d{8}$").unwrap());
        static UK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^07\d{9}$").unwrap());
        for seed in 0..100 {
            let au = generate_base(DataType::Phone, &mut stream(seed), Locale::AU, None);
            assert!(AU_RE.is_match(&au), "{au}");
            let uk = generate_base(DataType::Phone, &mut stream(seed), Locale::UK, None);
            assert!(UK_RE.is_match(&uk), "{uk}");
        }
    }

    #[test]
    fn test_nino_shape() {
        static NINO_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[A-CEGHJ-PR-TW-Z]{2}\d{6}[A-D]$").unwrap());
        for seed in 0..100 {
            let nino = generate_base(DataType::Nino, &mut stream(seed), Locale::UK, None);
            assert!(NINO_RE.is_match(&nino), "{nino}");
        }
    }

    #[test]
    fn test_uk_postcode_shape() {
        static PC_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[A-Z]{1,2}\d \d[A-Z]{2}$").unwrap());
        for seed in 0..100 {
            let pc = generate_base(DataType::UkPostcode, &mut stream(seed), Locale::UK, None);
            assert!(PC_RE.is_match(&pc), "{pc}");
        }
    }

    #[test]
    fn test_vin_shape() {
        let vin = generate_base(DataType::VinNumber, &mut stream(3), Locale::AU, None);
        assert_eq!(vin.len(), 17);
        assert!(!vin.contains('I') && !vin.contains('O') && !vin.contains('Q'));
    }

    #[test]
    fn test_dates_are_day_deterministic_and_in_range() {
        let date = generate_base(DataType::DateOfBirth, &mut stream(11), Locale::AU, None);
        let parsed = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap();
        assert!(parsed >= chrono::NaiveDate::from_ymd_opt(1930, 1, 1).unwrap());
        assert!(parsed <= chrono::NaiveDate::from_ymd_opt(2004, 12, 31).unwrap());

        let again = generate_base(DataType::DateOfBirth, &mut stream(11), Locale::AU, None);
        assert_eq!(date, again);
    }

    #[test]
    fn test_gps_within_bounds() {
        for seed in 0..50 {
            let gps = generate_base(DataType::GpsCoordinate, &mut stream(seed), Locale::AU, None);
            let (lat, lon) = gps.split_once(',').unwrap();
            let lat: f64 = lat.parse().unwrap();
            let lon: f64 = lon.parse().unwrap();
            assert!((-43.8..=-10.5).contains(&lat));
            assert!((113.1..=153.9).contains(&lon));
        }
    }
}
