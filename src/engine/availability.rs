use rust_decimal::Decimal;

use crate::limits::MAX_PERIODS_PER_HOUSE;
use crate::model::*;

use super::EngineError;

// ── Availability set ──────────────────────────────────────────────

/// First period, in iteration order, that fully contains `range`.
/// No preference by price or leftover size.
pub fn find_satisfying<'a>(periods: &'a [Period], range: &DateRange) -> Option<(usize, &'a Period)> {
    periods.iter().enumerate().find(|(_, p)| p.contains(range))
}

/// Consume `range` from the set. Returns the new set and the period it came out of.
///
/// The remainders take the consumed period's slot, so the order of all other
/// periods is untouched. Ranges straddling two periods are never stitched.
pub fn apply_booking(periods: &[Period], range: &DateRange) -> Result<(Vec<Period>, Period), EngineError> {
    let (idx, consumed) =
        find_satisfying(periods, range).ok_or(EngineError::NoAvailability(*range))?;
    let remainders = consumed.subtract(range);

    let mut updated = Vec::with_capacity(periods.len() + 1);
    updated.extend_from_slice(&periods[..idx]);
    updated.extend(remainders);
    updated.extend_from_slice(&periods[idx + 1..]);
    Ok((updated, consumed.clone()))
}

/// Sum of days covered by the set.
pub fn total_days(periods: &[Period]) -> i64 {
    periods.iter().map(Period::days).sum()
}

/// True if no two periods share a date.
pub fn is_disjoint(periods: &[Period]) -> bool {
    let mut ranges: Vec<DateRange> = periods.iter().map(Period::range).collect();
    ranges.sort_by_key(|r| r.start);
    ranges.windows(2).all(|w| w[0].end < w[1].start)
}

/// Checks a caller-supplied set before it is stored.
pub fn validate_periods(periods: &[Period]) -> Result<(), EngineError> {
    if periods.len() > MAX_PERIODS_PER_HOUSE {
        return Err(EngineError::LimitExceeded("too many availability periods"));
    }
    for p in periods {
        if p.start > p.end {
            return Err(EngineError::InvalidHouse(format!(
                "period starts {} after it ends {}",
                p.start, p.end
            )));
        }
        if p.nightly_price < Decimal::ZERO || p.promotion_price.is_some_and(|v| v < Decimal::ZERO) {
            return Err(EngineError::InvalidHouse(format!(
                "period {} has a negative price",
                p.range()
            )));
        }
    }
    if !is_disjoint(periods) {
        return Err(EngineError::InvalidHouse("availability periods overlap".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn period(start: &str, end: &str, price: i64) -> Period {
        Period::new(d(start), d(end), Decimal::from(price))
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(d(start), d(end))
    }

    #[test]
    fn find_returns_first_match_in_order() {
        let periods = vec![
            period("2024-07-01", "2024-07-31", 200),
            period("2024-06-01", "2024-06-30", 100),
            period("2024-06-10", "2024-06-20", 50),
        ];
        // Invalid as a set, but shows the tie-break is position, not price.
        let (idx, p) = find_satisfying(&periods, &range("2024-06-12", "2024-06-14")).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(p.nightly_price, Decimal::from(100));
    }

    #[test]
    fn apply_interior_booking_splits_in_place() {
        let periods = vec![
            period("2024-05-01", "2024-05-10", 80),
            period("2024-06-01", "2024-06-30", 100),
            period("2024-08-01", "2024-08-10", 120),
        ];
        let (updated, consumed) = apply_booking(&periods, &range("2024-06-10", "2024-06-15")).unwrap();
        assert_eq!(consumed, periods[1]);
        assert_eq!(
            updated,
            vec![
                period("2024-05-01", "2024-05-10", 80),
                period("2024-06-01", "2024-06-09", 100),
                period("2024-06-16", "2024-06-30", 100),
                period("2024-08-01", "2024-08-10", 120),
            ]
        );
    }

    #[test]
    fn apply_whole_period_removes_it() {
        let periods = vec![period("2024-06-01", "2024-06-30", 100)];
        let (updated, _) = apply_booking(&periods, &range("2024-06-01", "2024-06-30")).unwrap();
        assert!(updated.is_empty());
    }

    #[test]
    fn apply_outside_is_no_availability() {
        let periods = vec![period("2024-06-01", "2024-06-30", 100)];
        let err = apply_booking(&periods, &range("2024-05-01", "2024-05-10")).unwrap_err();
        assert!(matches!(err, EngineError::NoAvailability(_)));
    }

    #[test]
    fn apply_across_adjacent_periods_is_rejected() {
        let periods = vec![
            period("2024-06-01", "2024-06-15", 100),
            period("2024-06-16", "2024-06-30", 100),
        ];
        let err = apply_booking(&periods, &range("2024-06-10", "2024-06-20")).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn apply_never_adds_days() {
        let periods = vec![
            period("2024-06-01", "2024-06-30", 100),
            period("2024-07-05", "2024-07-09", 100),
        ];
        let before = total_days(&periods);
        let (updated, _) = apply_booking(&periods, &range("2024-07-06", "2024-07-08")).unwrap();
        assert_eq!(total_days(&updated), before - 3);
        assert!(is_disjoint(&updated));
    }

    #[test]
    fn validate_accepts_disjoint_set() {
        let periods = vec![
            period("2024-06-16", "2024-06-30", 100),
            period("2024-06-01", "2024-06-15", 90).with_promotion(Decimal::from(70)),
        ];
        assert!(validate_periods(&periods).is_ok());
        assert!(validate_periods(&[]).is_ok());
    }

    #[test]
    fn validate_rejects_overlap_inversion_and_negative_price() {
        let overlap = vec![
            period("2024-06-01", "2024-06-15", 100),
            period("2024-06-15", "2024-06-30", 100),
        ];
        assert!(matches!(validate_periods(&overlap), Err(EngineError::InvalidHouse(_))));

        let inverted = vec![period("2024-06-30", "2024-06-01", 100)];
        assert!(matches!(validate_periods(&inverted), Err(EngineError::InvalidHouse(_))));

        let negative = vec![period("2024-06-01", "2024-06-30", -1)];
        assert!(matches!(validate_periods(&negative), Err(EngineError::InvalidHouse(_))));

        let negative_promo = vec![period("2024-06-01", "2024-06-30", 10).with_promotion(Decimal::from(-5))];
        assert!(matches!(validate_periods(&negative_promo), Err(EngineError::InvalidHouse(_))));
    }

    #[test]
    fn validate_rejects_oversized_set() {
        let start = d("2000-01-01");
        let periods: Vec<Period> = (0..=MAX_PERIODS_PER_HOUSE as u64)
            .map(|i| {
                let day = start + chrono::Days::new(i * 2);
                Period::new(day, day, Decimal::ONE)
            })
            .collect();
        assert!(matches!(
            validate_periods(&periods),
            Err(EngineError::LimitExceeded(_))
        ));
    }
}
