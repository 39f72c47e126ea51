use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};

use rt04f::rt04f::{DEV_PAIR, TEST_PAIR, TRAIN_PAIRS};
use rt04f::Config;

/// Deterministic splitmix64 generator; the sample corpus is identical on every run.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[lo, hi)`.
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
        lo + (hi - lo) * unit
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const SPEAKERS: [&str; 6] = ["anchor_f", "anchor_m", "reporter_1", "reporter_2", "guest", "caller"];

/// UEM and MDTM contents for one `(stem, subset)` pair.
fn generate_pair(rng: &mut SampleRng, stem: &str, subset: &str, shows: usize) -> Result<(String, String)> {
    let mut uem = String::new();
    let mut mdtm = String::new();

    for show in 0..shows {
        let uri = format!("{stem}_{subset}_{show:03}");
        let length = rng.range(600.0, 1800.0);
        // scoring usually skips the jingle and the closing credits
        let (from, to) = (rng.range(5.0, 30.0), length - rng.range(5.0, 30.0));
        writeln!(uem, "{uri} 1 {from:.2} {to:.2}")?;

        let mut t = 0.0;
        let mut speaker = rng.pick(&SPEAKERS);
        while t < length {
            let duration = rng.range(2.0, 45.0).min(length - t);
            let gender = if speaker.ends_with("_f") { "adult_female" } else { "adult_male" };
            writeln!(
                mdtm,
                "{uri} 1 {t:.2} {duration:.2} speaker NA {gender} {speaker}"
            )?;
            t += duration + rng.range(0.0, 1.0);
            speaker = rng.pick(&SPEAKERS);
        }
    }
    Ok((uem, mdtm))
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let config = Config::with_data_dir(&out_dir);

    let mut rng = SampleRng(42);
    let pairs = TRAIN_PAIRS.iter().chain([&DEV_PAIR, &TEST_PAIR]);
    for &(stem, subset) in pairs {
        let shows = if subset == "trn" { 8 } else { 3 };
        let (uem, mdtm) = generate_pair(&mut rng, stem, subset, shows)?;
        for (ext, content) in [("uem", uem), ("mdtm", mdtm)] {
            let path = config.file_path(stem, subset, ext);
            std::fs::write(&path, content)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        println!("Wrote {shows} shows for {stem}/{subset}");
    }

    println!("Sample corpus in {}", out_dir.display());
    Ok(())
}
