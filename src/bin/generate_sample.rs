use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Months, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const CUSTOMERS_PER_MONTH: usize = 400;
const MONTHS: u32 = 15;

const MARITAL: [&str; 5] = ["Casado", "Solteiro", "União", "Separado", "Viúvo"];
const RESIDENCE: [&str; 6] = [
    "Casa",
    "Com os pais",
    "Governamental",
    "Aluguel",
    "Estúdio",
    "Comunitário",
];
const INCOME_TYPE: [&str; 5] = [
    "Assalariado",
    "Empresário",
    "Pensionista",
    "Servidor público",
    "Bolsista",
];
const EDUCATION: [&str; 5] = [
    "Primário",
    "Secundário",
    "Superior incompleto",
    "Superior completo",
    "Pós graduação",
];

/// Same column names pandas writes for the real dataset.
#[derive(Serialize)]
struct Row {
    #[serde(rename = "")]
    index: i64,
    data_ref: NaiveDate,
    sexo: &'static str,
    posse_de_veiculo: bool,
    posse_de_imovel: bool,
    tipo_renda: &'static str,
    educacao: &'static str,
    estado_civil: &'static str,
    tipo_residencia: &'static str,
    idade: i64,
    renda: f64,
}

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

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> (usize, &'a str) {
        let i = (self.next_u64() % options.len() as u64) as usize;
        (i, options[i])
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    let first = NaiveDate::from_ymd_opt(2015, 1, 1).expect("valid start date");
    let mut rows = Vec::with_capacity(CUSTOMERS_PER_MONTH * MONTHS as usize);

    for month in 0..MONTHS {
        let data_ref = first + Months::new(month);
        for _ in 0..CUSTOMERS_PER_MONTH {
            let sexo = if rng.chance(0.67) { "F" } else { "M" };
            let idade = rng.gauss(43.0, 11.0).clamp(22.0, 68.0).round() as i64;
            let (edu_level, educacao) = rng.pick(&EDUCATION);
            let (_, tipo_renda) = rng.pick(&INCOME_TYPE);

            // Log-normal income, raised by education, age and sex.
            let mut log_income = 8.1 + 0.18 * edu_level as f64 + 0.012 * (idade - 22) as f64;
            if sexo == "M" {
                log_income += 0.35;
            }
            let renda = (log_income + rng.gauss(0.0, 0.6)).exp();

            rows.push(Row {
                index: rows.len() as i64,
                data_ref,
                sexo,
                posse_de_veiculo: rng.chance(if sexo == "M" { 0.6 } else { 0.3 }),
                posse_de_imovel: rng.chance(0.67),
                tipo_renda,
                educacao,
                estado_civil: rng.pick(&MARITAL).1,
                tipo_residencia: rng.pick(&RESIDENCE).1,
                idade,
                renda: (renda * 100.0).round() / 100.0,
            });
        }
    }
    rows
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
    let text = |f: fn(&Row) -> &'static str| StringArray::from(rows.iter().map(f).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("__index_level_0__", DataType::Int64, false),
        Field::new("data_ref", DataType::Date32, false),
        Field::new("sexo", DataType::Utf8, false),
        Field::new("posse_de_veiculo", DataType::Boolean, false),
        Field::new("posse_de_imovel", DataType::Boolean, false),
        Field::new("tipo_renda", DataType::Utf8, false),
        Field::new("educacao", DataType::Utf8, false),
        Field::new("estado_civil", DataType::Utf8, false),
        Field::new("tipo_residencia", DataType::Utf8, false),
        Field::new("idade", DataType::Int64, false),
        Field::new("renda", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.index))),
            Arc::new(Date32Array::from_iter_values(
                rows.iter()
                    .map(|r| (r.data_ref - epoch).num_days() as i32),
            )),
            Arc::new(text(|r| r.sexo)),
            Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.posse_de_veiculo).collect::<Vec<_>>(),
            )),
            Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.posse_de_imovel).collect::<Vec<_>>(),
            )),
            Arc::new(text(|r| r.tipo_renda)),
            Arc::new(text(|r| r.educacao)),
            Arc::new(text(|r| r.estado_civil)),
            Arc::new(text(|r| r.tipo_residencia)),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.idade))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.renda))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let dir = Path::new("input");
    std::fs::create_dir_all(dir).context("creating input directory")?;

    let csv_path = dir.join("previsao_de_renda.csv");
    let parquet_path = dir.join("previsao_de_renda.parquet");
    write_csv(&csv_path, &rows)?;
    write_parquet(&parquet_path, &rows)?;

    let last = rows.last().map(|r| r.data_ref);
    println!(
        "Wrote {} customers ({} months, last {}) to {} and {}",
        rows.len(),
        MONTHS,
        last.map(|d| format!("{}-{:02}", d.year(), d.month())).unwrap_or_default(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
