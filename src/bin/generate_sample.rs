//! Writes a synthetic Winter Olympics medal table to `sample_medals.parquet`
//! and `sample_medals.csv` for trying out dashboard configs.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Host games: (year, city, latitude, longitude)
const GAMES: [(i64, &str, f64, f64); 6] = [
    (1988, "Calgary", 51.05, -114.07),
    (1992, "Albertville", 45.68, 6.39),
    (1994, "Lillehammer", 61.12, 10.47),
    (1998, "Nagano", 36.65, 138.19),
    (2002, "Salt Lake City", 40.76, -111.89),
    (2006, "Turin", 45.07, 7.69),
];

const SPORTS: [&str; 5] = ["Biathlon", "Curling", "Luge", "Skating", "Skiing"];
const COUNTRIES: [&str; 6] = ["AUT", "CAN", "GER", "NOR", "RUS", "USA"];
const GENDERS: [&str; 3] = ["M", "W", "X"];
const MEDALS: [&str; 3] = ["Gold", "Silver", "Bronze"];

struct Row {
    year: i64,
    city: &'static str,
    sport: &'static str,
    country: &'static str,
    gender: &'static str,
    medal: &'static str,
    latitude: f64,
    longitude: f64,
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let mut rows = Vec::new();
    for &(year, city, latitude, longitude) in &GAMES {
        for &sport in &SPORTS {
            // one event per gender per sport, one of each medal per event
            for &gender in &GENDERS {
                for &medal in &MEDALS {
                    rows.push(Row {
                        year,
                        city,
                        sport,
                        country: *rng.pick(&COUNTRIES),
                        gender,
                        medal,
                        latitude,
                        longitude,
                    });
                }
            }
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("Year", DataType::Int64, false),
        Field::new("City", DataType::Utf8, false),
        Field::new("Sport", DataType::Utf8, false),
        Field::new("Country", DataType::Utf8, false),
        Field::new("Gender", DataType::Utf8, false),
        Field::new("Medal", DataType::Utf8, false),
        Field::new("Latitude", DataType::Float64, false),
        Field::new("Longitude", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.city))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.sport))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.country))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.gender))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.medal))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.latitude))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.longitude))),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let parquet_path = "sample_medals.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    // Write CSV
    let csv_path = "sample_medals.csv";
    let mut csv_writer = csv::Writer::from_path(csv_path).context("creating CSV file")?;
    csv_writer.write_record([
        "Year", "City", "Sport", "Country", "Gender", "Medal", "Latitude", "Longitude",
    ])?;
    for r in &rows {
        csv_writer.write_record([
            r.year.to_string(),
            r.city.to_string(),
            r.sport.to_string(),
            r.country.to_string(),
            r.gender.to_string(),
            r.medal.to_string(),
            r.latitude.to_string(),
            r.longitude.to_string(),
        ])?;
    }
    csv_writer.flush()?;

    println!("Wrote {} medal records to {parquet_path} and {csv_path}", rows.len());
    Ok(())
}
