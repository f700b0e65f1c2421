use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::{Map, Value as JsonValue};

use super::aggregate::{join_growth, JoinedGrowth};
use super::loader::FRESH_WEIGHT_COLUMN;
use super::model::{
    combined, metric_columns, CellValue, EnvironmentData, EnvironmentRecord, GrowthData,
};
use crate::config::SiteConfig;

const ENVIRONMENT_HEADERS: [&str; 6] = ["time", "temperature", "humidity", "ph", "ec", "site"];
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Parquet,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Xlsx, ExportFormat::Parquet, ExportFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Json => "json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "Excel",
            ExportFormat::Parquet => "Parquet",
            ExportFormat::Json => "JSON",
        }
    }
}

/// Which combined table an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    Environment,
    Growth,
}

impl ExportTable {
    /// Suggested download name, e.g. `환경데이터.xlsx`.
    pub fn file_name(self, format: ExportFormat) -> String {
        let stem = match self {
            ExportTable::Environment => "환경데이터",
            ExportTable::Growth => "생육결과",
        };
        format!("{stem}.{}", format.extension())
    }
}

/// Serialize one combined table. Source tables are only borrowed.
pub fn export(
    table: ExportTable,
    format: ExportFormat,
    sites: &SiteConfig,
    env: &EnvironmentData,
    growth: &GrowthData,
) -> Result<Vec<u8>> {
    match (table, format) {
        (ExportTable::Environment, ExportFormat::Xlsx) => environment_xlsx(env),
        (ExportTable::Environment, ExportFormat::Parquet) => environment_parquet(env),
        (ExportTable::Environment, ExportFormat::Json) => environment_json(env),
        (ExportTable::Growth, ExportFormat::Xlsx) => growth_xlsx(sites, growth),
        (ExportTable::Growth, ExportFormat::Parquet) => growth_parquet(sites, growth),
        (ExportTable::Growth, ExportFormat::Json) => growth_json(sites, growth),
    }
}

// ---------------------------------------------------------------------------
// Growth table layout
// ---------------------------------------------------------------------------

const GROWTH_FIXED_HEADERS: [&str; 3] = ["site", "EC", FRESH_WEIGHT_COLUMN];
const SHEET_COLUMN_PREFIX: &str = "sheet_";

/// Columns of the combined growth table: site, EC, fresh weight, then every
/// extra sheet column in first-seen order.
///
/// A sheet column whose name clashes with a fixed column is written under a
/// `sheet_`-prefixed name, so the joined site and EC are never overwritten.
struct GrowthLayout<'a> {
    /// (output header, sheet column it reads)
    extras: Vec<(String, &'a str)>,
}

impl<'a> GrowthLayout<'a> {
    fn new(rows: &[JoinedGrowth<'a>]) -> Self {
        let metrics = metric_columns(rows.iter().map(|r| r.record));
        let mut taken: HashSet<String> = GROWTH_FIXED_HEADERS.iter().map(|h| h.to_string()).collect();
        taken.extend(metrics.iter().map(|m| m.to_string()));

        let extras = metrics
            .into_iter()
            .map(|name| {
                if !GROWTH_FIXED_HEADERS.iter().any(|fixed| *fixed == name) {
                    return (name.to_string(), name);
                }
                let mut header = format!("{SHEET_COLUMN_PREFIX}{name}");
                while taken.contains(&header) {
                    header.insert_str(0, SHEET_COLUMN_PREFIX);
                }
                log::warn!("Growth column '{name}' exported as '{header}'");
                taken.insert(header.clone());
                (header, name)
            })
            .collect();

        GrowthLayout { extras }
    }

    fn headers(&self) -> Vec<&str> {
        let mut headers: Vec<&str> = GROWTH_FIXED_HEADERS.to_vec();
        headers.extend(self.extras.iter().map(|(header, _)| header.as_str()));
        headers
    }
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

fn row_index(i: usize) -> Result<u32> {
    u32::try_from(i + 1).context("too many rows for a worksheet")
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, name) in headers.iter().enumerate() {
        let col = u16::try_from(col).context("too many columns for a worksheet")?;
        sheet.write_string_with_format(0, col, *name, &bold)?;
    }
    Ok(())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Text(s) | CellValue::DateTime(s) => {
            sheet.write_string(row, col, s)?;
        }
        CellValue::Integer(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(v) => {
            sheet.write_number(row, col, *v)?;
        }
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        CellValue::Empty => {}
    }
    Ok(())
}

pub fn environment_xlsx(env: &EnvironmentData) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("환경데이터")?;
    write_headers(sheet, &ENVIRONMENT_HEADERS)?;

    for (i, r) in combined(env).enumerate() {
        let row = row_index(i)?;
        sheet.write_string(row, 0, r.time.format(TIME_FORMAT).to_string())?;
        sheet.write_number(row, 1, r.temperature)?;
        sheet.write_number(row, 2, r.humidity)?;
        sheet.write_number(row, 3, r.ph)?;
        sheet.write_number(row, 4, r.ec)?;
        sheet.write_string(row, 5, r.site.as_str())?;
    }

    workbook.save_to_buffer().context("writing environment workbook")
}

pub fn growth_xlsx(sites: &SiteConfig, growth: &GrowthData) -> Result<Vec<u8>> {
    let rows = join_growth(sites, growth)?;
    let layout = GrowthLayout::new(&rows);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("생육결과")?;
    write_headers(sheet, &layout.headers())?;

    for (i, joined) in rows.iter().enumerate() {
        let row = row_index(i)?;
        sheet.write_string(row, 0, joined.record.site.as_str())?;
        sheet.write_number(row, 1, joined.target_ec)?;
        sheet.write_number(row, 2, joined.record.fresh_weight)?;
        for (i, (_, name)) in layout.extras.iter().enumerate() {
            if let Some(value) = joined.record.metric(name) {
                let col = u16::try_from(GROWTH_FIXED_HEADERS.len() + i)
                    .context("too many columns for a worksheet")?;
                write_cell(sheet, row, col, value)?;
            }
        }
    }

    workbook.save_to_buffer().context("writing growth workbook")
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn write_parquet(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<Vec<u8>> {
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(buf)
}

fn float_array<T>(rows: &[T], f: impl Fn(&T) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(rows.iter().map(f)))
}

pub fn environment_parquet(env: &EnvironmentData) -> Result<Vec<u8>> {
    let rows: Vec<&EnvironmentRecord> = combined(env).collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("humidity", DataType::Float64, false),
        Field::new("ph", DataType::Float64, false),
        Field::new("ec", DataType::Float64, false),
        Field::new("site", DataType::Utf8, false),
    ]));

    let times: Vec<i64> = rows.iter().map(|r| r.time.and_utc().timestamp_millis()).collect();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from(times)),
        float_array(&rows, |r| r.temperature),
        float_array(&rows, |r| r.humidity),
        float_array(&rows, |r| r.ph),
        float_array(&rows, |r| r.ec),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.site.as_str()))),
    ];

    write_parquet(schema, columns)
}

/// Extra growth columns are written as nullable text.
pub fn growth_parquet(sites: &SiteConfig, growth: &GrowthData) -> Result<Vec<u8>> {
    let rows = join_growth(sites, growth)?;
    let layout = GrowthLayout::new(&rows);

    let [site, ec, weight] = GROWTH_FIXED_HEADERS;
    let mut fields = vec![
        Field::new(site, DataType::Utf8, false),
        Field::new(ec, DataType::Float64, false),
        Field::new(weight, DataType::Float64, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.record.site.as_str()))),
        float_array(&rows, |r| r.target_ec),
        float_array(&rows, |r| r.record.fresh_weight),
    ];

    for (header, name) in &layout.extras {
        fields.push(Field::new(header.as_str(), DataType::Utf8, true));
        let values: StringArray = rows
            .iter()
            .map(|r| {
                r.record
                    .metric(name)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
            })
            .collect();
        columns.push(Arc::new(values));
    }

    write_parquet(Arc::new(Schema::new(fields)), columns)
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented array, one object per environment sample.
pub fn environment_json(env: &EnvironmentData) -> Result<Vec<u8>> {
    let rows: Vec<&EnvironmentRecord> = combined(env).collect();
    serde_json::to_vec_pretty(&rows).context("serializing environment table")
}

pub fn growth_json(sites: &SiteConfig, growth: &GrowthData) -> Result<Vec<u8>> {
    let rows = join_growth(sites, growth)?;
    let layout = GrowthLayout::new(&rows);
    let [site, ec, weight] = GROWTH_FIXED_HEADERS;
    let mut records = Vec::with_capacity(rows.len());

    for joined in &rows {
        let mut obj = Map::new();
        obj.insert(site.into(), JsonValue::from(joined.record.site.as_str()));
        obj.insert(ec.into(), JsonValue::from(joined.target_ec));
        obj.insert(weight.into(), JsonValue::from(joined.record.fresh_weight));
        for (header, name) in &layout.extras {
            if let Some(value) = joined.record.metric(name) {
                obj.insert(header.clone(), serde_json::to_value(value)?);
            }
        }
        records.push(JsonValue::Object(obj));
    }

    serde_json::to_vec_pretty(&records).context("serializing growth table")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use calamine::{Reader, Xlsx};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;
    use crate::data::loader::parse_timestamp;
    use crate::data::model::{GrowthRecord, SiteId};

    fn env_fixture() -> EnvironmentData {
        let mut data = EnvironmentData::new();
        for (site, hour) in [("송도고", "10"), ("송도고", "11"), ("하늘고", "10")] {
            let site = SiteId::new(site);
            data.entry(site.clone()).or_default().push(EnvironmentRecord {
                time: parse_timestamp(&format!("2025-05-01 {hour}:00")).unwrap(),
                temperature: 21.0,
                humidity: 55.0,
                ph: 6.2,
                ec: 1.3,
                site,
            });
        }
        data
    }

    fn growth_fixture() -> GrowthData {
        let songdo = SiteId::new("송도고");
        let haneul = SiteId::new("하늘고");
        let mut data = GrowthData::new();
        data.insert(
            songdo.clone(),
            vec![GrowthRecord {
                site: songdo,
                fresh_weight: 3.5,
                metrics: vec![
                    ("개체번호".into(), CellValue::Integer(1)),
                    ("잎 수(장)".into(), CellValue::Float(6.0)),
                ],
            }],
        );
        data.insert(
            haneul.clone(),
            vec![
                GrowthRecord {
                    site: haneul.clone(),
                    fresh_weight: 4.0,
                    metrics: vec![("비고".into(), CellValue::Text("정상".into()))],
                },
                GrowthRecord {
                    site: haneul,
                    fresh_weight: 5.0,
                    metrics: Vec::new(),
                },
            ],
        );
        data
    }

    /// Header names and data-row count of the first sheet.
    fn read_back_xlsx(bytes: Vec<u8>) -> (Vec<String>, usize) {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let name = workbook.sheet_names()[0].clone();
        let range = workbook.worksheet_range(&name).unwrap();
        let mut rows = range.rows();
        let headers = rows
            .next()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        (headers, rows.count())
    }

    #[test]
    fn environment_xlsx_round_trip() {
        let env = env_fixture();
        let (headers, rows) = read_back_xlsx(environment_xlsx(&env).unwrap());
        assert_eq!(headers, ENVIRONMENT_HEADERS);
        assert_eq!(rows, 3);
    }

    #[test]
    fn growth_xlsx_round_trip() {
        let growth = growth_fixture();
        let (headers, rows) = read_back_xlsx(growth_xlsx(&SiteConfig::default(), &growth).unwrap());
        assert_eq!(headers, ["site", "EC", "생중량(g)", "개체번호", "잎 수(장)", "비고"]);
        assert_eq!(rows, 3);
    }

    #[test]
    fn growth_export_rejects_unconfigured_site() {
        let mut growth = growth_fixture();
        let stray = SiteId::new("없는고");
        growth.insert(stray.clone(), vec![GrowthRecord {
            site: stray,
            fresh_weight: 1.0,
            metrics: Vec::new(),
        }]);
        assert!(growth_xlsx(&SiteConfig::default(), &growth).is_err());
    }

    #[test]
    fn growth_parquet_round_trip() {
        let growth = growth_fixture();
        let bytes = growth_parquet(&SiteConfig::default(), &growth).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("생육결과.parquet");
        std::fs::write(&path, bytes).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(std::fs::File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, 3);
        let schema = batches[0].schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, ["site", "EC", "생중량(g)", "개체번호", "잎 수(장)", "비고"]);
    }

    #[test]
    fn json_exports_are_record_arrays() {
        let env: JsonValue = serde_json::from_slice(&environment_json(&env_fixture()).unwrap()).unwrap();
        let env = env.as_array().unwrap();
        assert_eq!(env.len(), 3);
        assert_eq!(env[0]["site"], "송도고");
        assert_eq!(env[0]["time"], "2025-05-01T10:00:00");

        let growth: JsonValue =
            serde_json::from_slice(&growth_json(&SiteConfig::default(), &growth_fixture()).unwrap())
                .unwrap();
        let growth = growth.as_array().unwrap();
        assert_eq!(growth.len(), 3);
        assert_eq!(growth[0]["EC"], 1.0);
        assert_eq!(growth[0]["개체번호"], 1);
        assert_eq!(growth[1]["비고"], "정상");
    }

    #[test]
    fn sheet_columns_never_replace_joined_site_or_ec() {
        let songdo = SiteId::new("송도고");
        let mut growth = GrowthData::new();
        growth.insert(
            songdo.clone(),
            vec![GrowthRecord {
                site: songdo,
                fresh_weight: 2.0,
                metrics: vec![
                    ("EC".into(), CellValue::Float(0.97)),
                    ("site".into(), CellValue::Text("x".into())),
                    ("sheet_EC".into(), CellValue::Text("note".into())),
                ],
            }],
        );
        let sites = SiteConfig::default();
        let expected = ["site", "EC", "생중량(g)", "sheet_sheet_EC", "sheet_site", "sheet_EC"];

        let json: JsonValue = serde_json::from_slice(&growth_json(&sites, &growth).unwrap()).unwrap();
        assert_eq!(json[0]["EC"], 1.0);
        assert_eq!(json[0]["site"], "송도고");
        assert_eq!(json[0]["sheet_sheet_EC"], 0.97);
        assert_eq!(json[0]["sheet_site"], "x");
        assert_eq!(json[0]["sheet_EC"], "note");

        let (headers, rows) = read_back_xlsx(growth_xlsx(&sites, &growth).unwrap());
        assert_eq!(headers, expected);
        assert_eq!(rows, 1);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("생육결과.parquet");
        std::fs::write(&path, growth_parquet(&sites, &growth).unwrap()).unwrap();
        let batch = ParquetRecordBatchReaderBuilder::try_new(std::fs::File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn export_leaves_source_untouched() {
        let env = env_fixture();
        let growth = growth_fixture();
        let sites = SiteConfig::default();
        for format in ExportFormat::ALL {
            for table in [ExportTable::Environment, ExportTable::Growth] {
                assert!(!export(table, format, &sites, &env, &growth).unwrap().is_empty());
            }
        }
        assert_eq!(env, env_fixture());
        assert_eq!(growth, growth_fixture());
        assert_eq!(ExportTable::Environment.file_name(ExportFormat::Xlsx), "환경데이터.xlsx");
    }
}
