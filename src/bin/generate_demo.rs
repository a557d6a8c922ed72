use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::Float64Array;
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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const N_SAMPLES: usize = 2000;

/// Writes `samples/`, `pred-BtoKll/` and `catalog.json` into the output
/// directory (default `demo`).
fn main() -> Result<()> {
    env_logger::init();

    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "demo".to_string()));
    let mut rng = SimpleRng::new(42);

    // ---- importance samples: parquet with a weight column ----
    let mut mu = Vec::with_capacity(N_SAMPLES);
    let mut sigma = Vec::with_capacity(N_SAMPLES);
    let mut weight = Vec::with_capacity(N_SAMPLES);
    for _ in 0..N_SAMPLES {
        let m = rng.gauss(4.1, 0.3);
        let s = rng.gauss(0.8, 0.1).abs();
        mu.push(m);
        sigma.push(s);
        // reweight towards a narrower posterior around mu = 4.2
        weight.push((-(m - 4.2).powi(2) / (2.0 * 0.2f64.powi(2))).exp());
    }

    let samples_dir = out_dir.join("samples");
    std::fs::create_dir_all(&samples_dir).context("creating samples directory")?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("mu", DataType::Float64, false),
        Field::new("sigma", DataType::Float64, false),
        Field::new("weight", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(mu)),
            Arc::new(Float64Array::from(sigma)),
            Arc::new(Float64Array::from(weight)),
        ],
    )
    .context("building record batch")?;

    let samples_path = samples_dir.join("samples.parquet");
    let file = std::fs::File::create(&samples_path).context("creating samples.parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing samples")?;
    writer.close().context("closing parquet writer")?;

    // ---- prediction: CSV columns matched to description.json ----
    let pred_dir = out_dir.join("pred-BtoKll");
    std::fs::create_dir_all(&pred_dir).context("creating prediction directory")?;

    let description = serde_json::json!({
        "observables": [
            { "name": "Re{C9}" },
            {
                "name": "B->Kll::BR",
                "kinematics": { "q2_min": 1.1, "q2_max": 6.0 },
                "options": { "l": "mu" }
            }
        ]
    });
    std::fs::write(
        pred_dir.join("description.json"),
        serde_json::to_string_pretty(&description)?,
    )
    .context("writing description.json")?;

    let mut writer = csv::Writer::from_path(pred_dir.join("samples.csv")).context("creating samples.csv")?;
    writer.write_record(["c9", "br"])?;
    for _ in 0..N_SAMPLES {
        let c9 = rng.gauss(4.2, 0.2);
        let br = 1.2e-7 * (1.0 + 0.1 * (c9 - 4.2)) + rng.gauss(0.0, 5e-9);
        writer.write_record([c9.to_string(), br.to_string()])?;
    }
    writer.flush()?;

    // ---- catalog ----
    let catalog = serde_json::json!({
        "parameters": {
            "mu": { "latex": "$\\mu$" },
            "sigma": { "latex": "$\\sigma$" }
        },
        "observables": {
            "Re{C9}": { "latex": "\\mathrm{Re}\\, \\mathcal{C}_9" },
            "B->Kll::BR": { "latex": "\\mathcal{B}(\\bar{B}\\to \\bar{K}\\mu^+\\mu^-)" }
        }
    });
    std::fs::write(out_dir.join("catalog.json"), serde_json::to_string_pretty(&catalog)?)
        .context("writing catalog.json")?;

    println!(
        "Wrote {N_SAMPLES} samples to {} and {}",
        samples_dir.display(),
        pred_dir.display()
    );
    Ok(())
}
