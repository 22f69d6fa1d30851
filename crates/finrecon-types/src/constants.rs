//! System-wide constants and configuration defaults.

/// Number of minor units in one major currency unit (cents per unit).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Maximum fractional digits accepted when parsing a major-unit amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest absolute amount of a single statement line or ledger record, in
/// minor units (10 trillion major units).
pub const MAX_LINE_AMOUNT_MINOR: i64 = 1_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Confidence assigned to a reference + amount agreement.
pub const CONFIDENCE_EXACT: u8 = 100;

/// Confidence assigned to an amount-only agreement.
pub const CONFIDENCE_AMOUNT_ONLY: u8 = 80;

/// Confidence assigned to a reference-only agreement.
pub const CONFIDENCE_REFERENCE_ONLY: u8 = 70;

/// Confidence assigned to a fuzzy (substring or near-amount) agreement.
pub const CONFIDENCE_FUZZY: u8 = 60;

/// Confidence recorded for operator-forced matches.
pub const CONFIDENCE_MANUAL: u8 = 100;

/// Minimum confidence for an automatic match.
pub const DEFAULT_AUTO_MATCH_THRESHOLD: u8 = CONFIDENCE_FUZZY;

/// Absolute amount difference (minor units) still considered a fuzzy match.
pub const DEFAULT_FUZZY_AMOUNT_TOLERANCE: i64 = 100;

// ---------------------------------------------------------------------------
// Commission
// ---------------------------------------------------------------------------

/// Reference annual premium per policy, in minor units (3,000.00).
pub const DEFAULT_ANNUAL_PREMIUM_REFERENCE: i64 = 300_000;

/// Pure premium share of the annual premium, as a percentage.
pub const DEFAULT_PURE_PREMIUM_RATIO_PCT: i64 = 70;

/// Commission rate applied to the pure premium, as a percentage.
pub const DEFAULT_COMMISSION_RATE_PCT: i64 = 10;

/// Flat platform operating allowance per rider, in minor units (50.00).
pub const DEFAULT_FLAT_PER_RIDER_ALLOWANCE: i64 = 5_000;

/// Share of the post-allowance remainder going to joint mobilization, as a percentage.
pub const DEFAULT_JOINT_MOBILIZATION_PCT: i64 = 40;

/// Number of parties sharing the joint mobilization pool.
pub const JOINT_MOBILIZATION_SHARES: i64 = 2;

/// Number of parties sharing the profit-share pool.
pub const PROFIT_SHARE_SHARES: i64 = 3;

/// Default label for the first mobilization partner.
pub const DEFAULT_PARTNER_A_LABEL: &str = "KBA";

/// Default label for the second mobilization partner.
pub const DEFAULT_PARTNER_B_LABEL: &str = "ROBS";

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Fee rate on period transaction volume, in basis points (2.00%).
pub const DEFAULT_FEE_RATE_BPS: i64 = 200;

/// Prefix of generated settlement numbers.
pub const DEFAULT_SETTLEMENT_NUMBER_PREFIX: &str = "STL";

