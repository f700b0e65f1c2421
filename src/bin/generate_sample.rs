use std::path::Path;

use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::Workbook;

/// (site, target EC, mean temperature, mean humidity, fresh-weight peak factor)
const SITES: [(&str, f64, f64, f64, f64); 4] = [
    ("송도고", 1.0, 21.0, 62.0, 0.55),
    ("하늘고", 2.0, 22.5, 58.0, 1.0),
    ("아라고", 4.0, 20.0, 66.0, 0.7),
    ("동산고", 8.0, 23.0, 55.0, 0.35),
];

/// Seeded noise source so every run writes the same sample folder.
struct SampleRng {
    state: [u64; 4],
}

impl SampleRng {
    /// Expand `seed` into the four state words with splitmix64.
    fn seeded(seed: u64) -> Self {
        let mut x = seed;
        let state = std::array::from_fn(|_| {
            x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = x;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^ (z >> 31)
        });
        SampleRng { state }
    }

    // xoshiro256**
    fn next_u64(&mut self) -> u64 {
        let [a, b, c, d] = &mut self.state;
        let out = b.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *b << 17;
        *c ^= *a;
        *d ^= *b;
        *b ^= *c;
        *a ^= *d;
        *c ^= t;
        *d = d.rotate_left(45);
        out
    }

    /// Uniform in [0, 1).
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Normal sample around `mean`.
    fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        let radius = (-2.0 * self.unit().max(f64::MIN_POSITIVE).ln()).sqrt();
        let angle = std::f64::consts::TAU * self.unit();
        mean + sd * radius * angle.cos()
    }
}

fn write_environment_logs(dir: &Path, rng: &mut SampleRng) {
    let start = NaiveDate::from_ymd_opt(2025, 5, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start date");

    for &(site, target_ec, temperature, humidity, _) in &SITES {
        let path = dir.join(format!("{site}_환경데이터.csv"));
        let mut writer = csv::Writer::from_path(&path).expect("Failed to create CSV");
        writer
            .write_record(["time", "temperature", "humidity", "ph", "ec"])
            .expect("Failed to write header");

        // Hourly samples for two weeks, with a daily temperature cycle.
        for hour in 0..24 * 14 {
            let time = start + Duration::hours(hour);
            let daily = (2.0 * std::f64::consts::PI * (hour % 24) as f64 / 24.0).sin();
            writer
                .write_record([
                    time.format("%Y-%m-%d %H:%M:%S").to_string(),
                    format!("{:.2}", temperature + 2.5 * daily + rng.normal(0.0, 0.4)),
                    format!("{:.2}", humidity - 6.0 * daily + rng.normal(0.0, 1.5)),
                    format!("{:.2}", rng.normal(6.1, 0.15)),
                    format!("{:.2}", rng.normal(target_ec, 0.08 * target_ec)),
                ])
                .expect("Failed to write row");
        }
        writer.flush().expect("Failed to flush CSV");
        println!("Wrote {}", path.display());
    }
}

fn write_growth_workbook(dir: &Path, rng: &mut SampleRng) {
    let mut workbook = Workbook::new();

    for &(site, _, _, _, factor) in &SITES {
        let sheet = workbook.add_worksheet();
        sheet.set_name(site).expect("valid sheet name");
        for (col, header) in ["개체번호", "잎 수(장)", "지상부 길이(mm)", "지하부길이(mm)", "생중량(g)"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *header).expect("Failed to write header");
        }

        for row in 1..=30u32 {
            let weight = rng.normal(4.0 * factor + 1.0, 0.6).max(0.1);
            let values = [
                row as f64,
                rng.normal(6.0 + 3.0 * factor, 1.0).round().max(1.0),
                rng.normal(60.0 + 40.0 * factor, 8.0).max(5.0),
                rng.normal(80.0 + 30.0 * factor, 10.0).max(5.0),
                (weight * 100.0).round() / 100.0,
            ];
            for (col, value) in values.iter().enumerate() {
                sheet
                    .write_number(row, col as u16, *value)
                    .expect("Failed to write cell");
            }
        }
    }

    let path = dir.join("4개교_생육결과데이터.xlsx");
    workbook.save(&path).expect("Failed to save workbook");
    println!("Wrote {}", path.display());
}

fn main() {
    let dir = Path::new("data");
    std::fs::create_dir_all(dir).expect("Failed to create data directory");

    let mut rng = SampleRng::seeded(42);
    write_environment_logs(dir, &mut rng);
    write_growth_workbook(dir, &mut rng);
}
