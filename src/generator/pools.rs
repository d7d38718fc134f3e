//! Static value pools for the format generators.
//!
//! Pool contents are part of the deterministic contract: reordering or
//! resizing a pool changes which synthetic value an original maps to, so
//! entries are only ever appended.

/// Given names.
pub const FIRST_NAMES: &[&str] = &[
    "Oliver", "Charlotte", "Jack", "Amelia", "Noah", "Olivia", "William", "Isla", "Leo", "Mia",
    "Lucas", "Grace", "Thomas", "Ava", "Henry", "Willow", "Charlie", "Harper", "James", "Ella",
    "Ethan", "Ruby", "Alexander", "Zoe", "Mason", "Evie", "Harrison", "Sophie", "Hunter", "Ivy",
    "Levi", "Chloe", "Daniel", "Lily", "Samuel", "Matilda", "Archie", "Sienna", "Oscar", "Audrey",
    "Benjamin", "Hazel", "Max", "Lucy", "Theodore", "Georgia", "Elijah", "Penelope", "Joshua",
    "Eleanor",
];

/// Family names.
pub const LAST_NAMES: &[&str] = &[
    "Smith", "Jones", "Williams", "Brown", "Wilson", "Taylor", "Johnson", "White", "Martin",
    "Anderson", "Thompson", "Nguyen", "Walker", "Harris", "Lee", "Ryan", "Robinson", "Kelly",
    "King", "Davis", "Wright", "Evans", "Roberts", "Green", "Hall", "Wood", "Jackson", "Clarke",
    "Patel", "Khan", "Lewis", "James", "Phillips", "Mason", "Mitchell", "Rose", "Davies",
    "Rodriguez", "Cox", "Alexander", "Garden", "Campbell", "Johnston", "Moore", "Smyth",
    "O'Neill", "Doherty", "Stewart", "Quinn", "Murphy",
];

/// Cities and suburbs.
pub const CITIES: &[&str] = &[
    "Sydney", "Melbourne", "Brisbane", "Perth", "Adelaide", "Hobart", "Darwin", "Canberra",
    "Newcastle", "Wollongong", "Geelong", "Townsville", "Cairns", "Toowoomba", "Ballarat",
    "Bendigo", "Launceston", "Mackay", "Rockhampton", "Bunbury", "Bundaberg", "Hervey Bay",
    "Wagga Wagga", "Coffs Harbour", "Gladstone", "Mildura", "Shepparton", "Albury", "Port Macquarie",
    "Tamworth", "Orange", "Dubbo", "Geraldton", "Nowra", "Bathurst", "Warrnambool", "Kalgoorlie",
    "Devonport", "Mount Gambier", "Lismore",
];

/// State full names, aligned index-for-index with [`STATE_ABBRS`].
pub const STATES: &[&str] = &[
    "New South Wales",
    "Victoria",
    "Queensland",
    "Western Australia",
    "South Australia",
    "Tasmania",
    "Australian Capital Territory",
    "Northern Territory",
];

/// State abbreviations, aligned index-for-index with [`STATES`].
pub const STATE_ABBRS: &[&str] = &["NSW", "VIC", "QLD", "WA", "SA", "TAS", "ACT", "NT"];

/// Countries.
pub const COUNTRIES: &[&str] = &[
    "Australia", "New Zealand", "United Kingdom", "Ireland", "Canada", "United States",
    "Germany", "France", "Netherlands", "Singapore", "Japan", "South Africa", "India",
    "Philippines", "Vietnam", "Thailand", "Indonesia", "Malaysia", "Fiji", "Papua New Guinea",
];

/// Street names.
pub const STREET_NAMES: &[&str] = &[
    "High", "Church", "Station", "Park", "Victoria", "Albert", "George", "King", "Queen",
    "Elizabeth", "William", "Short", "Railway", "Beach", "Bridge", "Market", "Chapel", "Mill",
    "Forest", "River", "Hill", "Lake", "Garden", "Spring", "Sunset", "Rose", "Cedar", "Banksia",
    "Wattle", "Eucalypt",
];

/// Street types.
pub const STREET_TYPES: &[&str] = &[
    "Street", "Road", "Avenue", "Drive", "Court", "Place", "Crescent", "Lane", "Parade",
    "Boulevard", "Close", "Way",
];

/// Secondary address unit designators.
pub const UNIT_TYPES: &[&str] = &["Unit", "Suite", "Level", "Apartment", "Shop"];

/// Email domains.
pub const EMAIL_DOMAINS: &[&str] = &[
    "example.com", "example.org", "example.net", "mailinator.com", "fastmail.test",
    "outlook.test", "gmail.test", "bigpond.test", "iinet.test", "optusnet.test",
];

/// Leading words for company names.
pub const COMPANY_WORDS: &[&str] = &[
    "Apex", "Summit", "Horizon", "Pinnacle", "Coastal", "Southern", "Northern", "Eastern",
    "Western", "Central", "Pacific", "Harbour", "Golden", "Silver", "Ironbark", "Bluegum",
    "Redline", "Stirling", "Meridian", "Crestwood", "Riverside", "Hillcrest", "Seaboard",
    "Lakeside", "Highland",
];

/// Trailing words for company names.
pub const COMPANY_ACTIVITIES: &[&str] = &[
    "Logistics", "Transport", "Freight", "Haulage", "Distribution", "Services", "Holdings",
    "Solutions", "Industries", "Enterprises", "Group", "Carriers", "Couriers", "Removals",
    "Warehousing",
];

/// Company legal suffixes.
pub const COMPANY_SUFFIXES: &[&str] = &["Pty Ltd", "Ltd", "Group", "Co", "Partners"];

/// Vehicle make and model combinations.
pub const VEHICLE_MAKE_MODELS: &[&str] = &[
    "Toyota Hilux", "Ford Ranger", "Isuzu D-Max", "Mitsubishi Triton", "Mazda BT-50",
    "Nissan Navara", "Volvo FH16", "Kenworth T610", "Scania R500", "Mercedes-Benz Actros",
    "Hino 500 Series", "Isuzu NPR", "Fuso Canter", "Iveco Daily", "DAF CF450",
    "Mack Trident", "Freightliner Cascadia", "Toyota HiAce", "Ford Transit", "Renault Master",
];

/// Depot and yard descriptors combined with a city name.
pub const DEPOT_KINDS: &[&str] = &["Depot", "Distribution Centre", "Yard", "Terminal", "Hub"];

/// UK postcode area codes.
pub const UK_POSTCODE_AREAS: &[&str] = &[
    "SW", "SE", "NW", "N", "E", "W", "EC", "WC", "B", "M", "L", "LS", "S", "G", "EH", "CF",
    "BS", "NE", "NG", "OX", "CB", "BT", "YO", "HU", "PL",
];

/// NINO prefixes restricted to administratively valid pairs.
pub const NINO_PREFIXES: &[&str] = &[
    "AB", "CE", "EG", "HJ", "JG", "KT", "LM", "NP", "PR", "RW", "SX", "TZ", "WA", "YB", "ZE",
];

/// VIN alphabet (ISO 3779: digits and capitals excluding I, O and Q).
pub const VIN_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKLMNPRSTUVWXYZ";
