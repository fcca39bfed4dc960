use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray, Date32Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use super::model::{CustomerRecord, CustomerTable};

/// Columns every source must provide.
const REQUIRED_COLUMNS: [&str; 10] = [
    "data_ref",
    "sexo",
    "idade",
    "estado_civil",
    "tipo_residencia",
    "tipo_renda",
    "educacao",
    "posse_de_veiculo",
    "posse_de_imovel",
    "renda",
];

/// Header names pandas gives its index column, depending on how it was written.
const INDEX_COLUMNS: [&str; 3] = ["", "Unnamed: 0", "__index_level_0__"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("reading {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON")]
    Json(#[from] serde_json::Error),
    #[error("malformed parquet file")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("unreadable column data")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: unparseable reference date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}, column '{column}': {reason}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the customer table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – pandas `to_csv` output, index column optional
/// * `.json`    – `[{ "data_ref": "2015-01-01", "sexo": "F", ... }, ...]`
/// * `.parquet` – same column names, dates as Date32/Date64/Timestamp/text
pub fn load_file(path: &Path) -> Result<CustomerTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    log::debug!("parsed {} customers from {}", table.len(), path.display());
    Ok(table)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Row-oriented sources (CSV, JSON)
// ---------------------------------------------------------------------------

/// One row as it appears in CSV/JSON sources, before the date is parsed.
#[derive(Debug, Deserialize)]
struct RawCustomer {
    #[serde(default, rename = "", alias = "Unnamed: 0")]
    row_id: Option<u64>,
    data_ref: DateRepr,
    sexo: String,
    idade: u32,
    estado_civil: String,
    tipo_residencia: String,
    tipo_renda: String,
    educacao: String,
    #[serde(deserialize_with = "deserialize_flag")]
    posse_de_veiculo: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    posse_de_imovel: bool,
    renda: Option<f64>,
}

/// pandas writes dates as text in CSV and as epoch milliseconds in JSON.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateRepr {
    EpochMillis(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(b) => Ok(b),
        FlagRepr::Int(0) => Ok(false),
        FlagRepr::Int(1) => Ok(true),
        FlagRepr::Int(i) => Err(serde::de::Error::custom(format!("'{i}' is not a flag"))),
        FlagRepr::Text(s) => parse_flag(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("'{s}' is not a flag"))),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD`, optionally followed by a time of day.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|dt| dt.date())
                .ok()
        })
}

impl RawCustomer {
    fn into_record(self, row: usize) -> Result<CustomerRecord, LoadError> {
        let reference_date = match &self.data_ref {
            DateRepr::Text(s) => parse_date(s),
            DateRepr::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms).map(|dt| dt.date_naive()),
        }
        .ok_or_else(|| LoadError::InvalidDate {
            row,
            value: match self.data_ref {
                DateRepr::Text(s) => s,
                DateRepr::EpochMillis(ms) => ms.to_string(),
            },
        })?;

        Ok(CustomerRecord {
            id: self.row_id.unwrap_or(row as u64),
            reference_date,
            sex: self.sexo,
            age: self.idade,
            marital_status: self.estado_civil,
            residence_type: self.tipo_residencia,
            income_type: self.tipo_renda,
            education: self.educacao,
            owns_vehicle: self.posse_de_veiculo,
            owns_property: self.posse_de_imovel,
            income: self.renda.unwrap_or(f64::NAN),
        })
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, extra columns ignored.
fn load_csv(path: &Path) -> Result<CustomerTable, LoadError> {
    let mut reader = csv::Reader::from_reader(open(path)?);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn(column.to_string()));
        }
    }

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<RawCustomer>().enumerate() {
        records.push(result?.into_record(row)?);
    }

    Ok(CustomerTable::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default of `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<CustomerTable, LoadError> {
    let raw: Vec<RawCustomer> = serde_json::from_reader(BufReader::new(open(path)?))?;

    let records = raw
        .into_iter()
        .enumerate()
        .map(|(row, r)| r.into_record(row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CustomerTable::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by pandas (`df.to_parquet()`) or Polars.
///
/// Numeric and boolean columns are cast to a common Arrow type up front so
/// any integer width or float precision is accepted.
fn load_parquet(path: &Path) -> Result<CustomerTable, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let offset = records.len();
        read_batch(&batch, offset, &mut records)?;
    }

    Ok(CustomerTable::from_records(records))
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, LoadError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
}

fn read_batch(
    batch: &RecordBatch,
    offset: usize,
    out: &mut Vec<CustomerRecord>,
) -> Result<(), LoadError> {
    let dates = DateColumn::new(column(batch, "data_ref")?)?;
    let sex = cast(column(batch, "sexo")?, &DataType::Utf8)?;
    let marital = cast(column(batch, "estado_civil")?, &DataType::Utf8)?;
    let residence = cast(column(batch, "tipo_residencia")?, &DataType::Utf8)?;
    let income_type = cast(column(batch, "tipo_renda")?, &DataType::Utf8)?;
    let education = cast(column(batch, "educacao")?, &DataType::Utf8)?;
    let age = cast(column(batch, "idade")?, &DataType::Int64)?;
    let vehicle = cast(column(batch, "posse_de_veiculo")?, &DataType::Boolean)?;
    let property = cast(column(batch, "posse_de_imovel")?, &DataType::Boolean)?;
    let income = cast(column(batch, "renda")?, &DataType::Float64)?;

    let ids = INDEX_COLUMNS
        .iter()
        .find_map(|name| batch.column_by_name(name))
        .map(|col| cast(col, &DataType::Int64))
        .transpose()?;

    for i in 0..batch.num_rows() {
        let row = offset + i;
        let id = ids
            .as_ref()
            .filter(|col| !col.is_null(i))
            .map(|col| col.as_primitive::<Int64Type>().value(i) as u64)
            .unwrap_or(row as u64);

        let age_value = non_null(&age, i, row, "idade")?.as_primitive::<Int64Type>().value(i);
        let age_value = u32::try_from(age_value).map_err(|_| LoadError::InvalidValue {
            row,
            column: "idade",
            reason: format!("{age_value} is not a valid age"),
        })?;

        out.push(CustomerRecord {
            id,
            reference_date: dates.value(i, row)?,
            sex: text(&sex, i, row, "sexo")?,
            age: age_value,
            marital_status: text(&marital, i, row, "estado_civil")?,
            residence_type: text(&residence, i, row, "tipo_residencia")?,
            income_type: text(&income_type, i, row, "tipo_renda")?,
            education: text(&education, i, row, "educacao")?,
            owns_vehicle: non_null(&vehicle, i, row, "posse_de_veiculo")?
                .as_boolean()
                .value(i),
            owns_property: non_null(&property, i, row, "posse_de_imovel")?
                .as_boolean()
                .value(i),
            income: if income.is_null(i) {
                f64::NAN
            } else {
                income.as_primitive::<Float64Type>().value(i)
            },
        });
    }

    Ok(())
}

fn non_null<'a>(
    col: &'a ArrayRef,
    i: usize,
    row: usize,
    column: &'static str,
) -> Result<&'a ArrayRef, LoadError> {
    if col.is_null(i) {
        return Err(LoadError::InvalidValue {
            row,
            column,
            reason: "null value".to_string(),
        });
    }
    Ok(col)
}

fn text(col: &ArrayRef, i: usize, row: usize, column: &'static str) -> Result<String, LoadError> {
    Ok(non_null(col, i, row, column)?
        .as_string::<i32>()
        .value(i)
        .to_string())
}

/// The reference-date column, either native temporal data or text to parse.
enum DateColumn {
    Native(Date32Array),
    Text(ArrayRef),
}

impl DateColumn {
    fn new(col: &ArrayRef) -> Result<Self, LoadError> {
        match col.data_type() {
            DataType::Utf8 | DataType::LargeUtf8 => Ok(DateColumn::Text(cast(col, &DataType::Utf8)?)),
            _ => {
                let dates = cast(col, &DataType::Date32)?;
                Ok(DateColumn::Native(dates.as_primitive::<Date32Type>().clone()))
            }
        }
    }

    fn value(&self, i: usize, row: usize) -> Result<NaiveDate, LoadError> {
        match self {
            DateColumn::Native(arr) => {
                if arr.is_null(i) {
                    return Err(LoadError::InvalidDate {
                        row,
                        value: "null".to_string(),
                    });
                }
                arr.value_as_date(i).ok_or_else(|| LoadError::InvalidDate {
                    row,
                    value: arr.value(i).to_string(),
                })
            }
            DateColumn::Text(arr) => {
                let value = if arr.is_null(i) {
                    "null"
                } else {
                    arr.as_string::<i32>().value(i)
                };
                parse_date(value).ok_or_else(|| LoadError::InvalidDate {
                    row,
                    value: value.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{BooleanArray, Float64Array, Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::fixtures::date;

    const PANDAS_CSV: &str = "\
,data_ref,id_cliente,sexo,posse_de_veiculo,posse_de_imovel,qtd_filhos,tipo_renda,educacao,estado_civil,tipo_residencia,idade,tempo_emprego,qt_pessoas_residencia,renda
0,2015-01-01,15056,F,False,True,0,Empresário,Secundário,Solteiro,Casa,26,6.6,1.0,8060.34
1,2015-01-01,9968,M,True,True,0,Assalariado,Superior completo,Casado,Casa,28,7.18,2.0,1852.15
2,2015-02-01,4312,F,True,True,0,Empresário,Superior completo,Casado,Casa,35,0.84,2.0,
";

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn loads_pandas_csv() {
        let file = write_temp(".csv", PANDAS_CSV);
        let table = load_file(file.path()).unwrap();

        assert_eq!(table.len(), 3);
        let first = &table.records()[0];
        assert_eq!(first.id, 0);
        assert_eq!(first.reference_date, date(2015, 1, 1));
        assert_eq!(first.sex, "F");
        assert_eq!(first.age, 26);
        assert_eq!(first.marital_status, "Solteiro");
        assert_eq!(first.income_type, "Empresário");
        assert!(!first.owns_vehicle);
        assert!(first.owns_property);
        assert_eq!(first.income, 8060.34);

        assert_eq!(table.records()[1].education, "Superior completo");
        assert!(table.records()[2].income.is_nan());
    }

    #[test]
    fn csv_without_index_uses_row_position() {
        let csv = "\
data_ref,sexo,idade,estado_civil,tipo_residencia,tipo_renda,educacao,posse_de_veiculo,posse_de_imovel,renda
2015-01-01 00:00:00,M,40,Casado,Casa,Assalariado,Primário,1,0,1000
2015-01-01 00:00:00,F,41,Casado,Casa,Assalariado,Primário,true,false,2000
";
        let file = write_temp(".csv", csv);
        let table = load_file(file.path()).unwrap();
        let ids: Vec<u64> = table.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(table.records()[0].owns_vehicle);
        assert!(!table.records()[1].owns_property);
        assert_eq!(table.records()[1].reference_date, date(2015, 1, 1));
    }

    #[test]
    fn csv_with_unnamed_index_header_keeps_the_index_as_id() {
        let csv = "\
Unnamed: 0,data_ref,id_cliente,sexo,posse_de_veiculo,posse_de_imovel,qtd_filhos,tipo_renda,educacao,estado_civil,tipo_residencia,idade,tempo_emprego,qt_pessoas_residencia,renda
7,2015-03-01,4312,M,True,False,1,Pensionista,Primário,Viúvo,Governamental,63,,2.0,2511.82
";
        let file = write_temp(".csv", csv);
        let table = load_file(file.path()).unwrap();

        assert_eq!(table.len(), 1);
        let record = &table.records()[0];
        assert_eq!(record.id, 7);
        assert_eq!(record.reference_date, date(2015, 3, 1));
        assert_eq!(record.income_type, "Pensionista");
        assert_eq!(record.residence_type, "Governamental");
        assert_eq!(record.age, 63);
        assert!(record.owns_vehicle);
        assert!(!record.owns_property);
        assert_eq!(record.income, 2511.82);
    }

    #[test]
    fn unparseable_date_is_reported_with_its_row() {
        let csv = PANDAS_CSV.replace("2015-02-01", "first of feb");
        let file = write_temp(".csv", &csv);
        match load_file(file.path()) {
            Err(LoadError::InvalidDate { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "first of feb");
            }
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = PANDAS_CSV.replace("renda\n", "salario\n");
        let file = write_temp(".csv", &csv);
        assert!(matches!(
            load_file(file.path()),
            Err(LoadError::MissingColumn(c)) if c == "renda"
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = Path::new("/definitely/not/here/previsao_de_renda.csv");
        assert!(matches!(load_file(path), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_temp(".xlsx", "");
        assert!(matches!(
            load_file(file.path()),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn loads_records_json_with_epoch_dates() {
        let json = r#"[
            {"data_ref": 1420070400000, "sexo": "F", "idade": 26, "estado_civil": "Solteiro",
             "tipo_residencia": "Casa", "tipo_renda": "Empresário", "educacao": "Secundário",
             "posse_de_veiculo": false, "posse_de_imovel": true, "renda": 8060.34},
            {"data_ref": "2015-02-01", "sexo": "M", "idade": 28, "estado_civil": "Casado",
             "tipo_residencia": "Casa", "tipo_renda": "Assalariado", "educacao": "Primário",
             "posse_de_veiculo": true, "posse_de_imovel": false, "renda": null}
        ]"#;
        let file = write_temp(".json", json);
        let table = load_file(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].reference_date, date(2015, 1, 1));
        assert_eq!(table.records()[1].reference_date, date(2015, 2, 1));
        assert!(table.records()[1].owns_vehicle);
        assert!(table.records()[1].income.is_nan());
    }

    #[test]
    fn loads_parquet_with_text_dates_and_narrow_ints() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("data_ref", DataType::Utf8, false),
            Field::new("sexo", DataType::Utf8, false),
            Field::new("idade", DataType::Int32, false),
            Field::new("estado_civil", DataType::Utf8, false),
            Field::new("tipo_residencia", DataType::Utf8, false),
            Field::new("tipo_renda", DataType::Utf8, false),
            Field::new("educacao", DataType::Utf8, false),
            Field::new("posse_de_veiculo", DataType::Boolean, false),
            Field::new("posse_de_imovel", DataType::Boolean, false),
            Field::new("renda", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["2015-01-01", "2015-03-01"])),
                Arc::new(StringArray::from(vec!["F", "M"])),
                Arc::new(Int32Array::from(vec![26, 61])),
                Arc::new(StringArray::from(vec!["Solteiro", "Viúvo"])),
                Arc::new(StringArray::from(vec!["Casa", "Aluguel"])),
                Arc::new(StringArray::from(vec!["Empresário", "Pensionista"])),
                Arc::new(StringArray::from(vec!["Secundário", "Primário"])),
                Arc::new(BooleanArray::from(vec![false, true])),
                Arc::new(BooleanArray::from(vec![true, false])),
                Arc::new(Float64Array::from(vec![Some(8060.34), None])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(File::create(file.path()).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        let second = &table.records()[1];
        assert_eq!(second.id, 1);
        assert_eq!(second.reference_date, date(2015, 3, 1));
        assert_eq!(second.age, 61);
        assert_eq!(second.residence_type, "Aluguel");
        assert!(second.owns_vehicle);
        assert!(second.income.is_nan());
    }
}
