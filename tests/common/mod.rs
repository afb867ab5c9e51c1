#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

pub const HEADER: &str = "order_id,order_time,distance_km,order_items,weather,traffic,rider_queue,prep_time_min,delivery_time_min";

const WEATHER: [&str; 4] = ["clear", "cloudy", "rainy", "stormy"];

/// Deterministic pseudo-random order history with a known additive signal.
pub fn synthetic_rows(n: usize) -> Vec<String> {
    let mut state: u64 = 0x5eed;
    let mut next = || -> f64 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) as f64) / ((1u64 << 31) as f64)
    };

    (0..n)
        .map(|i| {
            let distance_km = 0.5 + (next() * 14.5 * 10.0).round() / 10.0;
            let order_items = 1 + (next() * 6.0) as i64;
            let weather = WEATHER[(next() * 4.0) as usize % 4];
            let traffic = (next() * 4.0) as i64;
            let rider_queue = (next() * 5.0) as i64;
            let prep_time_min = 5 + (next() * 20.0) as i64;
            let hour = (next() * 24.0) as u32 % 24;
            let minute = (next() * 60.0) as u32 % 60;

            let weather_delay = match weather {
                "rainy" => 6.0,
                "stormy" => 12.0,
                _ => 0.0,
            };
            let rush = if (17..=20).contains(&hour) { 5.0 } else { 0.0 };
            let noise = (next() - 0.5) * 3.0;
            let label = 8.0
                + 2.5 * distance_km
                + prep_time_min as f64
                + 3.0 * rider_queue as f64
                + 2.0 * traffic as f64
                + 0.5 * order_items as f64
                + weather_delay
                + rush
                + noise;

            format!(
                "ORD{i:05},2024-05-{day:02} {hour:02}:{minute:02}:00,{distance_km},{order_items},{weather},{traffic},{rider_queue},{prep_time_min},{label:.2}",
                day = 1 + i % 28,
            )
        })
        .collect()
}

pub fn write_csv(path: &Path, rows: &[String]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
}
