//! CSV round-trip of price series, for fixtures and offline runs.

use anyhow::{Context, Result};
use base::entities::price::{PriceValue, Volume};
use base::entities::PricePoint;
use chrono::NaiveDate;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DATE_PATTERN_FOR_SERIALIZATION: &str = "%Y-%m-%d";

#[derive(Serialize, Deserialize, Debug)]
struct PriceRecord {
    date: String,
    open: PriceValue,
    high: PriceValue,
    low: PriceValue,
    close: PriceValue,
    adj_close: PriceValue,
    volume: Volume,
}

pub fn serialize_price_series<P: AsRef<Path>>(prices: &[PricePoint], path: P) -> Result<()> {
    let mut writer = Writer::from_path(path)
        .context("an error occurred on creating a writer from the path")?;

    for price in prices {
        writer.serialize(PriceRecord {
            date: price
                .date
                .format(DATE_PATTERN_FOR_SERIALIZATION)
                .to_string(),
            open: price.open,
            high: price.high,
            low: price.low,
            close: price.close,
            adj_close: price.adj_close,
            volume: price.volume,
        })?;
    }

    writer.flush()?;

    Ok(())
}

pub fn deserialize_price_series<P: AsRef<Path>>(path: P) -> Result<Vec<PricePoint>> {
    let mut reader = Reader::from_path(path)
        .context("an error occurred on creating a reader from the path")?;

    let mut prices = Vec::new();

    for record in reader.deserialize() {
        let record: PriceRecord = record.context("an error on deserializing a price record")?;

        prices.push(PricePoint {
            date: NaiveDate::parse_from_str(&record.date, DATE_PATTERN_FOR_SERIALIZATION)
                .context("an error on parsing a price record date")?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            adj_close: record.adj_close,
            volume: record.volume,
        });
    }

    Ok(prices)
}
