//! Single-pass aggregates over row streams.
use super::rows::stream_ages;
use crate::core::db::Server;
use crate::core::{ProdevError, Result};
use crate::record::Aged;
use rust_decimal::Decimal;

/// Average age over a stream, in one pass and constant memory.
///
/// The running total is an exact decimal. An empty stream averages to zero.
/// The first `Err` in the stream is returned as is.
pub fn average_age<I, A>(rows: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Result<A>>,
    A: Aged,
{
    let mut total = Decimal::ZERO;
    let mut count: u64 = 0;
    for row in rows {
        total = total
            .checked_add(Decimal::from(row?.age()))
            .ok_or_else(|| ProdevError::InvalidArgument("age total overflowed".to_string()))?;
        count += 1;
    }

    if count == 0 {
        return Ok(Decimal::ZERO);
    }
    Ok(total / Decimal::from(count))
}

/// Renders an average with two decimal places, rounding half to even.
pub fn format_average(avg: Decimal) -> String {
    format!("{:.2}", avg.round_dp(2))
}

/// Average age of every user in the configured database.
pub fn average_user_age(server: &Server) -> Result<Decimal> {
    stream_ages(server, |ages| average_age(ages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::stream::batches::stream_batches;
    use crate::test_utils::SeededServer;

    #[test]
    fn test_empty_is_zero() {
        let none: Vec<Result<u32>> = Vec::new();
        assert_eq!(average_age(none).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_simple_average() {
        let avg = average_age(vec![Ok(20u32), Ok(30u32)]).unwrap();
        assert_eq!(avg, Decimal::from(25));
        assert_eq!(format_average(avg), "25.00");
    }

    #[test]
    fn test_repeating_fraction() {
        let avg = average_age(vec![Ok(1u32), Ok(1u32), Ok(2u32)]).unwrap();
        assert_eq!(format_average(avg), "1.33");
    }

    #[test]
    fn test_error_propagates() {
        let rows: Vec<Result<u32>> = vec![Ok(20), Err(ProdevError::DataLoad("x".into()))];
        assert!(average_age(rows).is_err());
    }

    #[test]
    fn test_average_over_table() {
        let fixture = SeededServer::with_ages(&[20, 30, 41]);
        let avg = average_user_age(&fixture.server).unwrap();
        assert_eq!(format_average(avg), "30.33");
        assert_eq!(fixture.server.open_connections(), 0);
    }

    #[test]
    fn test_invariant_to_batch_size() {
        let fixture = SeededServer::with_ages(&[19, 23, 47, 52, 61, 33, 28]);
        let expected = average_user_age(&fixture.server).unwrap();
        for size in 1..=8 {
            let avg = stream_batches(&fixture.server, size, |batches| {
                let flat = batches.flat_map(|batch| match batch {
                    Ok(batch) => batch.into_iter().map(Ok).collect::<Vec<Result<Record>>>(),
                    Err(e) => vec![Err(e)],
                });
                average_age(flat)
            })
            .unwrap();
            assert_eq!(avg, expected, "batch size {}", size);
        }
    }
}
