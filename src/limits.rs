/// Discounted-soon lookahead, in calendar months from today.
pub const DISCOUNT_LOOKAHEAD_MONTHS: u32 = 3;

/// Max availability periods a single house may carry.
pub const MAX_PERIODS_PER_HOUSE: usize = 1_000;

/// Max nights in one booking (about three years).
pub const MAX_BOOKING_NIGHTS: i64 = 1_100;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 8_192;
pub const MAX_OWNER_ID_LEN: usize = 128;
