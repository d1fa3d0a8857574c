//! Data loading
//!
//! Loads OHLCV bars from CSV files for the diagnostics commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::Candle;

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load OHLCV data from a CSV file (`datetime,open,high,low,close[,volume]`)
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let reader = csv::Reader::from_path(path.as_ref()).context("Failed to open CSV file")?;
    read_candles(reader)
}

/// Parse OHLCV rows from any CSV source with a header line
pub fn read_candles<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Candle>> {
    let mut candles = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = parse_datetime(dt_str)?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Missing {} column", name))?
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse {} on row {}", name, row_idx + 1))
        };

        let open = field(1, "open")?;
        let high = field(2, "high")?;
        let low = field(3, "low")?;
        let close = field(4, "close")?;
        // Volume is informational only
        let volume = match record.get(5) {
            Some(v) if !v.trim().is_empty() => field(5, "volume")?,
            _ => 0.0,
        };

        candles.push(Candle::new_unchecked(datetime, open, high, low, close, volume));
    }

    Ok(candles)
}

fn parse_datetime(dt_str: &str) -> Result<DateTime<Utc>> {
    let dt_str = dt_str.trim();
    dt_str
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Try parsing without timezone and assume UTC
            chrono::NaiveDateTime::parse_from_str(dt_str, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .with_context(|| format!("Failed to parse datetime: {}", dt_str))
}

// =============================================================================
// Validation
// =============================================================================

/// Check OHLC consistency and ordering before feeding bars to a channel engine
pub fn validate_candles(candles: &[Candle]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if candles.is_empty() {
        errors.push("No candles provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, candle) in candles.iter().enumerate() {
        if let Err(e) = candle.validate() {
            errors.push(format!("Candle {}: {}", i, e));
        }
        if candle.volume < 0.0 {
            warnings.push(format!("Candle {}: negative volume ({})", i, candle.volume));
        }
        if i > 0 && candle.datetime <= candles[i - 1].datetime {
            errors.push(format!("Candle {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(text: &str) -> Result<Vec<Candle>> {
        read_candles(csv::Reader::from_reader(text.as_bytes()))
    }

    #[test]
    fn test_read_candles_both_datetime_formats() {
        let candles = parse(
            "datetime,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,1.1000,1.1010,1.0990,1.1005,120\n\
             2024-01-01 01:00:00,1.1005,1.1020,1.1000,1.1015,80\n",
        )
        .unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[1].datetime,
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()
        );
        assert_eq!(candles[0].close, 1.1005);
        assert_eq!(candles[0].volume, 120.0);
    }

    #[test]
    fn test_volume_column_optional() {
        let candles =
            parse("datetime,open,high,low,close\n2024-01-01T00:00:00Z,1.1,1.2,1.0,1.15\n").unwrap();
        assert_eq!(candles[0].volume, 0.0);
    }

    #[test]
    fn test_bad_row_reports_error() {
        assert!(parse("datetime,open,high,low,close\n2024-01-01T00:00:00Z,x,1.2,1.0,1.15\n").is_err());
        assert!(parse("datetime,open,high,low,close\nyesterday,1.1,1.2,1.0,1.15\n").is_err());
    }

    #[test]
    fn test_validate_candles() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let good = Candle::new_unchecked(t0, 100.0, 105.0, 95.0, 102.0, 1000.0);
        assert!(validate_candles(&[good.clone()]).is_valid());

        let inverted = Candle::new_unchecked(t0 + chrono::Duration::hours(1), 100.0, 90.0, 95.0, 92.0, 0.0);
        let result = validate_candles(&[good.clone(), inverted]);
        assert_eq!(result.errors.len(), 1);

        let result = validate_candles(&[good.clone(), good]);
        assert!(result.errors.iter().any(|e| e.contains("not chronological")));

        assert!(!validate_candles(&[]).is_valid());
    }
}
