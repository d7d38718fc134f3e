//! Standard PII data types and their policies.
//!
//! `Suburb` and `ZipCode` are accepted as aliases and resolve to the `City`
//! and `PostCode` generators; the canonical name is what the cache files
//! and logs carry.

use serde::{Deserialize, Serialize};

/// Standard PII data types recognized by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Given name
    FirstName,
    /// Family name
    LastName,
    /// Given and family name separated by a space
    FullName,
    /// Email address
    Email,
    /// Phone number (locale-dependent format)
    Phone,
    /// Complete single-line address
    FullAddress,
    /// Street address line
    AddressLine1,
    /// Secondary address line (unit, suite)
    AddressLine2,
    /// City or suburb name
    City,
    /// State or territory full name
    State,
    /// State or territory abbreviation
    StateAbbr,
    /// Numeric postcode
    PostCode,
    /// Country name
    Country,
    /// UK-format postcode
    UkPostcode,
    /// 16-digit card number with valid Luhn check digit
    CreditCard,
    /// UK National Insurance number
    Nino,
    /// UK bank sort code (NN-NN-NN)
    SortCode,
    /// Driver licence number
    LicenseNumber,
    /// Company or trading name
    CompanyName,
    /// Australian Business Number with valid checksum
    BusinessAbn,
    /// Australian Company Number with valid check digit
    BusinessAcn,
    /// Vehicle registration plate
    VehicleRegistration,
    /// 17-character vehicle identification number
    VinNumber,
    /// Vehicle make and model
    VehicleMakeModel,
    /// Engine serial number
    EngineNumber,
    /// Latitude,longitude pair
    GpsCoordinate,
    /// Logistics route code
    RouteCode,
    /// Depot or yard location name
    DepotLocation,
    /// Calendar date
    Date,
    /// Date of birth (bounded adult range)
    DateOfBirth,
}

impl DataType {
    /// Resolve a standard type name, including the `Suburb` and `ZipCode`
    /// aliases. Returns `None` for custom or unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        let data_type = match name {
            "FirstName" => DataType::FirstName,
            "LastName" => DataType::LastName,
            "FullName" => DataType::FullName,
            "Email" => DataType::Email,
            "Phone" => DataType::Phone,
            "FullAddress" => DataType::FullAddress,
            "AddressLine1" => DataType::AddressLine1,
            "AddressLine2" => DataType::AddressLine2,
            "City" | "Suburb" => DataType::City,
            "State" => DataType::State,
            "StateAbbr" => DataType::StateAbbr,
            "PostCode" | "ZipCode" => DataType::PostCode,
            "Country" => DataType::Country,
            "UKPostcode" => DataType::UkPostcode,
            "CreditCard" => DataType::CreditCard,
            "NINO" => DataType::Nino,
            "SortCode" => DataType::SortCode,
            "LicenseNumber" => DataType::LicenseNumber,
            "CompanyName" => DataType::CompanyName,
            "BusinessABN" => DataType::BusinessAbn,
            "BusinessACN" => DataType::BusinessAcn,
            "VehicleRegistration" => DataType::VehicleRegistration,
            "VINNumber" => DataType::VinNumber,
            "VehicleMakeModel" => DataType::VehicleMakeModel,
            "EngineNumber" => DataType::EngineNumber,
            "GPSCoordinate" => DataType::GpsCoordinate,
            "RouteCode" => DataType::RouteCode,
            "DepotLocation" => DataType::DepotLocation,
            "Date" => DataType::Date,
            "DateOfBirth" => DataType::DateOfBirth,
            _ => return None,
        };
        Some(data_type)
    }

    /// Canonical name used in hashes, cache files and logs.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::FirstName => "FirstName",
            DataType::LastName => "LastName",
            DataType::FullName => "FullName",
            DataType::Email => "Email",
            DataType::Phone => "Phone",
            DataType::FullAddress => "FullAddress",
            DataType::AddressLine1 => "AddressLine1",
            DataType::AddressLine2 => "AddressLine2",
            DataType::City => "City",
            DataType::State => "State",
            DataType::StateAbbr => "StateAbbr",
            DataType::PostCode => "PostCode",
            DataType::Country => "Country",
            DataType::UkPostcode => "UKPostcode",
            DataType::CreditCard => "CreditCard",
            DataType::Nino => "NINO",
            DataType::SortCode => "SortCode",
            DataType::LicenseNumber => "LicenseNumber",
            DataType::CompanyName => "CompanyName",
            DataType::BusinessAbn => "BusinessABN",
            DataType::BusinessAcn => "BusinessACN",
            DataType::VehicleRegistration => "VehicleRegistration",
            DataType::VinNumber => "VINNumber",
            DataType::VehicleMakeModel => "VehicleMakeModel",
            DataType::EngineNumber => "EngineNumber",
            DataType::GpsCoordinate => "GPSCoordinate",
            DataType::RouteCode => "RouteCode",
            DataType::DepotLocation => "DepotLocation",
            DataType::Date => "Date",
            DataType::DateOfBirth => "DateOfBirth",
        }
    }

    /// Whether the mapping cache stores values of this type by default.
    ///
    /// Low-cardinality types benefit from caching; high-cardinality types
    /// (emails, card numbers, coordinates) would only grow the cache without
    /// meaningful hit rates, so they are computed on every miss.
    pub fn is_cached(&self) -> bool {
        matches!(
            self,
            DataType::FirstName
                | DataType::LastName
                | DataType::FullName
                | DataType::City
                | DataType::State
                | DataType::StateAbbr
                | DataType::Country
                | DataType::PostCode
                | DataType::UkPostcode
                | DataType::CompanyName
                | DataType::VehicleMakeModel
                | DataType::RouteCode
                | DataType::DepotLocation
        )
    }

    /// Whether originals carry case-insensitive comparison rules.
    ///
    /// Email folds only its local-part, UKPostcode folds the whole value;
    /// the folding itself lives in `seed::normalize`.
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, DataType::Email | DataType::UkPostcode)
    }

    /// All standard types, used by the cache loader.
    pub fn all() -> &'static [DataType] {
        &[
            DataType::FirstName,
            DataType::LastName,
            DataType::FullName,
            DataType::Email,
            DataType::Phone,
            DataType::FullAddress,
            DataType::AddressLine1,
            DataType::AddressLine2,
            DataType::City,
            DataType::State,
            DataType::StateAbbr,
            DataType::PostCode,
            DataType::Country,
            DataType::UkPostcode,
            DataType::CreditCard,
            DataType::Nino,
            DataType::SortCode,
            DataType::LicenseNumber,
            DataType::CompanyName,
            DataType::BusinessAbn,
            DataType::BusinessAcn,
            DataType::VehicleRegistration,
            DataType::VinNumber,
            DataType::VehicleMakeModel,
            DataType::EngineNumber,
            DataType::GpsCoordinate,
            DataType::RouteCode,
            DataType::DepotLocation,
            DataType::Date,
            DataType::DateOfBirth,
        ]
    }
}
