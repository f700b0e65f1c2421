use std::collections::btree_map::Entry;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::datatypes::{DataType, Float64Type, TimeUnit, TimestampMillisecondType};
use arrow::record_batch::RecordBatch;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::error::{DataError, Result};
use super::locator::{find_files_sorted, normalized_file_name};
use super::model::{
    Availability, CellValue, Datasets, EnvironmentData, EnvironmentRecord, GrowthData,
    GrowthRecord, SiteId,
};
use super::normalize::normalize;
use crate::config::{DashboardConfig, DuplicateSitePolicy};

/// Columns every environment log must provide.
const ENVIRONMENT_COLUMNS: [&str; 5] = ["time", "temperature", "humidity", "ph", "ec"];

/// Header of the fresh-weight column in the growth workbook.
pub const FRESH_WEIGHT_COLUMN: &str = "생중량(g)";
const FRESH_WEIGHT_ALIAS: &str = "fresh_weight";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load both datasets named by `config`. Either one missing is an error.
pub fn load_datasets(config: &DashboardConfig) -> Result<Datasets> {
    let environment = load_environment(
        &config.data_dir,
        &config.environment_keyword,
        config.duplicate_policy,
    )?
    .into_result()?;
    let growth = load_growth(&config.data_dir, &config.growth_keyword)?.into_result()?;

    log::info!(
        "Loaded {} environment tables and {} growth tables from {}",
        environment.len(),
        growth.len(),
        config.data_dir.display()
    );
    Ok(Datasets {
        environment,
        growth,
    })
}

/// Load every environment log in `dir` whose name contains `keyword`.
///
/// The site of each file is the part of its name before the first `_`.
/// Files are processed in sorted name order, so with
/// [`DuplicateSitePolicy::Overwrite`] the last name wins.
pub fn load_environment(
    dir: &Path,
    keyword: &str,
    policy: DuplicateSitePolicy,
) -> Result<Availability<EnvironmentData>> {
    let files = find_files_sorted(dir, keyword)?;
    if files.is_empty() {
        return Ok(Availability::Unavailable {
            keyword: keyword.to_string(),
        });
    }

    let mut data = EnvironmentData::new();
    for path in &files {
        let site = site_from_file_name(path);
        let records = load_environment_file(path, &site)?;
        log::info!(
            "Loaded {} environment rows for {site} from {}",
            records.len(),
            path.display()
        );

        match data.entry(site) {
            Entry::Vacant(slot) => {
                slot.insert(records);
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicateSitePolicy::Overwrite => {
                    log::warn!(
                        "{} replaces earlier data for site {}",
                        path.display(),
                        slot.key()
                    );
                    slot.insert(records);
                }
                DuplicateSitePolicy::Error => {
                    return Err(DataError::DuplicateSite {
                        site: slot.key().clone(),
                        path: path.clone(),
                    });
                }
                DuplicateSitePolicy::Merge => {
                    let table = slot.get_mut();
                    table.extend(records);
                    table.sort_by_key(|r| r.time);
                }
            },
        }
    }

    Ok(Availability::Available(data))
}

/// Load the first growth workbook in `dir` whose name contains `keyword`.
/// Each sheet is one site.
pub fn load_growth(dir: &Path, keyword: &str) -> Result<Availability<GrowthData>> {
    let files = find_files_sorted(dir, keyword)?;
    let Some(path) = files.first() else {
        return Ok(Availability::Unavailable {
            keyword: keyword.to_string(),
        });
    };
    if files.len() > 1 {
        log::warn!(
            "{} files match '{keyword}', using {}",
            files.len(),
            path.display()
        );
    }

    let file_name = normalized_file_name(path);
    let mut workbook = open_workbook_auto(path)?;
    let mut data = GrowthData::new();

    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet)?;
        let rows: Vec<Vec<CellValue>> = range
            .rows()
            .map(|row| row.iter().map(cell_value).collect())
            .collect();

        let site = SiteId::new(&sheet);
        let records = parse_growth_rows(&format!("{file_name} [{sheet}]"), &site, &rows)?;
        log::info!("Loaded {} growth rows for {site}", records.len());

        if data.insert(site.clone(), records).is_some() {
            log::warn!("Sheet '{sheet}' replaces an earlier sheet for site {site}");
        }
    }

    Ok(Availability::Available(data))
}

/// Site id encoded in an environment file name: the prefix before the first
/// `_`, or the whole stem when there is none.
pub fn site_from_file_name(path: &Path) -> SiteId {
    let stem = path
        .file_stem()
        .map(|s| normalize(&s.to_string_lossy()))
        .unwrap_or_default();
    SiteId::new(stem.split('_').next().unwrap_or_default())
}

/// Parse a timestamp in any of the layouts sensor loggers commonly write.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Environment logs
// ---------------------------------------------------------------------------

/// Dispatch by extension.
fn load_environment_file(path: &Path, site: &SiteId) -> Result<Vec<EnvironmentRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_environment_csv(path, site),
        "parquet" | "pq" => load_environment_parquet(path, site),
        _ => Err(DataError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvironmentRow {
    time: String,
    temperature: f64,
    humidity: f64,
    ph: f64,
    ec: f64,
}

/// CSV layout: header row naming at least `time, temperature, humidity, ph,
/// ec`. Other columns are ignored.
fn load_environment_csv(path: &Path, site: &SiteId) -> Result<Vec<EnvironmentRecord>> {
    let source_name = normalized_file_name(path);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in ENVIRONMENT_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::MissingColumn {
                source_name,
                column: column.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<RawEnvironmentRow>().enumerate() {
        let row_no = i + 1;
        let raw = row.map_err(|e| DataError::MalformedRow {
            source_name: source_name.clone(),
            row: row_no,
            reason: e.to_string(),
        })?;
        let time = parse_timestamp(&raw.time).ok_or_else(|| DataError::MalformedTimestamp {
            source_name: source_name.clone(),
            row: row_no,
            value: raw.time.clone(),
        })?;

        let finite = |value: f64, name: &str| finite_measurement(&source_name, row_no, name, value);
        records.push(EnvironmentRecord {
            time,
            temperature: finite(raw.temperature, "temperature")?,
            humidity: finite(raw.humidity, "humidity")?,
            ph: finite(raw.ph, "ph")?,
            ec: finite(raw.ec, "ec")?,
            site: site.clone(),
        });
    }

    Ok(records)
}

/// Parquet layout: the same five columns. `time` may be a timestamp, date or
/// text column; the measurements any numeric (or numeric text) type.
fn load_environment_parquet(path: &Path, site: &SiteId) -> Result<Vec<EnvironmentRecord>> {
    let source_name = normalized_file_name(path);
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    let mut row_offset = 0;

    for batch in reader {
        let batch = batch?;
        let times = timestamp_column(column(&batch, &source_name, "time")?)?;
        let temperature = float_column(column(&batch, &source_name, "temperature")?)?;
        let humidity = float_column(column(&batch, &source_name, "humidity")?)?;
        let ph = float_column(column(&batch, &source_name, "ph")?)?;
        let ec = float_column(column(&batch, &source_name, "ec")?)?;

        for (row, time) in times.into_iter().enumerate() {
            let row_no = row_offset + row + 1;
            let time = time.map_err(|value| DataError::MalformedTimestamp {
                source_name: source_name.clone(),
                row: row_no,
                value,
            })?;
            let value = |arr: &Float64Array, name: &str| -> Result<f64> {
                if arr.is_null(row) {
                    Err(DataError::MalformedRow {
                        source_name: source_name.clone(),
                        row: row_no,
                        reason: format!("'{name}' is missing or not a number"),
                    })
                } else {
                    finite_measurement(&source_name, row_no, name, arr.value(row))
                }
            };

            records.push(EnvironmentRecord {
                time,
                temperature: value(&temperature, "temperature")?,
                humidity: value(&humidity, "humidity")?,
                ph: value(&ph, "ph")?,
                ec: value(&ec, "ec")?,
                site: site.clone(),
            });
        }
        row_offset += batch.num_rows();
    }

    Ok(records)
}

/// Measurements must be finite; `NaN` and infinities parse as floats but are
/// not readings.
fn finite_measurement(source_name: &str, row: usize, name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DataError::MalformedRow {
            source_name: source_name.to_string(),
            row,
            reason: format!("'{name}' is not a finite number ({value})"),
        })
    }
}

// -- Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, source_name: &str, name: &str) -> Result<&'a ArrayRef> {
    batch
        .schema_ref()
        .index_of(name)
        .map(|idx| batch.column(idx))
        .map_err(|_| DataError::MissingColumn {
            source_name: source_name.to_string(),
            column: name.to_string(),
        })
}

/// Numeric view of any column arrow can cast to Float64; unparseable values
/// become nulls.
fn float_column(col: &ArrayRef) -> Result<Float64Array> {
    let cast = arrow::compute::cast(col.as_ref(), &DataType::Float64)?;
    Ok(cast.as_primitive::<Float64Type>().clone())
}

/// Per-row timestamps; `Err` carries the offending raw text.
fn timestamp_column(
    col: &ArrayRef,
) -> Result<Vec<std::result::Result<NaiveDateTime, String>>> {
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let text = arrow::compute::cast(col.as_ref(), &DataType::Utf8)?;
            let text = text.as_string::<i32>();
            Ok((0..text.len())
                .map(|row| {
                    if text.is_null(row) {
                        return Err(String::new());
                    }
                    let raw = text.value(row);
                    parse_timestamp(raw).ok_or_else(|| raw.to_string())
                })
                .collect())
        }
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => {
            let millis = arrow::compute::cast(
                col.as_ref(),
                &DataType::Timestamp(TimeUnit::Millisecond, None),
            )?;
            let millis = millis.as_primitive::<TimestampMillisecondType>();
            Ok((0..millis.len())
                .map(|row| {
                    if millis.is_null(row) {
                        return Err(String::new());
                    }
                    let ms = millis.value(row);
                    DateTime::from_timestamp_millis(ms)
                        .map(|dt| dt.naive_utc())
                        .ok_or_else(|| ms.to_string())
                })
                .collect())
        }
        other => Err(DataError::Arrow(arrow::error::ArrowError::CastError(
            format!("time column has unsupported type {other:?}"),
        ))),
    }
}

// ---------------------------------------------------------------------------
// Growth workbook
// ---------------------------------------------------------------------------

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => CellValue::DateTime(d.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::DateTime(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}

fn is_fresh_weight_header(header: &str) -> bool {
    let header = normalize(header.trim());
    header == normalize(FRESH_WEIGHT_COLUMN) || header.eq_ignore_ascii_case(FRESH_WEIGHT_ALIAS)
}

/// Turn one sheet (header row first) into growth records.
///
/// A sheet with no rows is an empty table. Rows whose cells are all empty
/// are padding and skipped; any other row needs a numeric fresh weight.
fn parse_growth_rows(
    source_name: &str,
    site: &SiteId,
    rows: &[Vec<CellValue>],
) -> Result<Vec<GrowthRecord>> {
    let Some((header_row, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    let weight_idx = headers
        .iter()
        .position(|h| is_fresh_weight_header(h))
        .ok_or_else(|| DataError::MissingColumn {
            source_name: source_name.to_string(),
            column: FRESH_WEIGHT_COLUMN.to_string(),
        })?;

    let mut records = Vec::with_capacity(body.len());
    for (i, row) in body.iter().enumerate() {
        if row.iter().all(CellValue::is_empty) {
            continue;
        }
        let row_no = i + 1;
        let weight_cell = row.get(weight_idx).unwrap_or(&CellValue::Empty);
        let fresh_weight = weight_cell
            .as_f64()
            .ok_or_else(|| DataError::MalformedRow {
                source_name: source_name.to_string(),
                row: row_no,
                reason: format!("fresh weight '{weight_cell}' is not a number"),
            })?;

        let metrics = headers
            .iter()
            .enumerate()
            .filter(|(j, h)| *j != weight_idx && !h.is_empty())
            .map(|(j, h)| (h.clone(), row.get(j).cloned().unwrap_or(CellValue::Empty)))
            .collect();

        records.push(GrowthRecord {
            site: site.clone(),
            fresh_weight,
            metrics,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use unicode_normalization::UnicodeNormalization;

    const ENV_HEADER: &str = "time,temperature,humidity,ph,ec\n";

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn write_growth_workbook(dir: &Path, name: &str, sheets: &[(&str, &[f64])]) {
        let mut workbook = Workbook::new();
        for (sheet, weights) in sheets {
            let ws = workbook.add_worksheet();
            ws.set_name(*sheet).unwrap();
            ws.write_string(0, 0, "개체번호").unwrap();
            ws.write_string(0, 1, "잎 수(장)").unwrap();
            ws.write_string(0, 2, FRESH_WEIGHT_COLUMN).unwrap();
            for (i, w) in weights.iter().enumerate() {
                let row = i as u32 + 1;
                ws.write_number(row, 0, row as f64).unwrap();
                ws.write_number(row, 1, 5.0).unwrap();
                ws.write_number(row, 2, *w).unwrap();
            }
        }
        workbook.save(dir.join(name)).unwrap();
    }

    #[test]
    fn loads_environment_csv_and_tags_site() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "송도고_환경데이터.csv",
            &format!("{ENV_HEADER}2025-05-01 10:00:00,21.5,60,6.1,1.1\n2025-05-01 11:00,22.5,58,6.0,0.9\n"),
        );
        write(tmp.path(), "notes.txt", "irrelevant");

        let data = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite)
            .unwrap()
            .into_result()
            .unwrap();

        let table = &data[&SiteId::new("송도고")];
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].temperature, 21.5);
        assert_eq!(table[1].time, parse_timestamp("2025-05-01T11:00:00").unwrap());
        assert!(table.iter().all(|r| r.site.as_str() == "송도고"));
    }

    #[test]
    fn decomposed_file_name_yields_composed_site() {
        let tmp = tempfile::tempdir().unwrap();
        let name: String = "하늘고_환경데이터.csv".nfd().collect();
        write(tmp.path(), &name, &format!("{ENV_HEADER}2025-05-01,20,50,6,2\n"));

        let data = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite)
            .unwrap()
            .into_result()
            .unwrap();
        assert!(data.contains_key(&SiteId::new("하늘고")));
        assert_eq!(data.keys().next().unwrap().as_str(), "하늘고");
    }

    #[test]
    fn duplicate_site_last_file_wins() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "S_a_환경데이터.csv", &format!("{ENV_HEADER}2025-05-01,1,1,1,1\n"));
        write(
            tmp.path(),
            "S_b_환경데이터.csv",
            &format!("{ENV_HEADER}2025-05-02,2,2,2,2\n2025-05-03,3,3,3,3\n"),
        );

        let data = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(data.len(), 1);
        let temps: Vec<f64> = data[&SiteId::new("S")].iter().map(|r| r.temperature).collect();
        assert_eq!(temps, [2.0, 3.0]);
    }

    #[test]
    fn duplicate_site_error_and_merge_policies() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "S_a_환경데이터.csv", &format!("{ENV_HEADER}2025-05-03,1,1,1,1\n"));
        write(tmp.path(), "S_b_환경데이터.csv", &format!("{ENV_HEADER}2025-05-02,2,2,2,2\n"));

        let err = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Error).unwrap_err();
        assert!(matches!(err, DataError::DuplicateSite { ref site, .. } if site.as_str() == "S"));

        let merged = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Merge)
            .unwrap()
            .into_result()
            .unwrap();
        let temps: Vec<f64> = merged[&SiteId::new("S")].iter().map(|r| r.temperature).collect();
        assert_eq!(temps, [2.0, 1.0]);
    }

    #[test]
    fn malformed_timestamp_fails_the_load() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "A_환경데이터.csv",
            &format!("{ENV_HEADER}2025-05-01,1,1,1,1\nyesterday,1,1,1,1\n"),
        );
        let err = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite)
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::MalformedTimestamp { row: 2, ref value, .. } if value == "yesterday"
        ));
    }

    #[test]
    fn malformed_number_and_missing_column_fail() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "A_환경데이터.csv", &format!("{ENV_HEADER}2025-05-01,hot,1,1,1\n"));
        assert!(matches!(
            load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite),
            Err(DataError::MalformedRow { row: 1, .. })
        ));

        write(tmp.path(), "A_환경데이터.csv", "time,temperature,humidity,ec\n2025-05-01,1,1,1\n");
        assert!(matches!(
            load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite),
            Err(DataError::MissingColumn { ref column, .. }) if column == "ph"
        ));
    }

    #[test]
    fn unsupported_extension_fails() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "A_환경데이터.txt", "whatever");
        assert!(matches!(
            load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite),
            Err(DataError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn loads_environment_parquet() {
        let tmp = tempfile::tempdir().unwrap();
        let site = SiteId::new("아라고");
        let mut source = EnvironmentData::new();
        source.insert(
            site.clone(),
            vec![EnvironmentRecord {
                time: parse_timestamp("2025-05-01 08:30:00").unwrap(),
                temperature: 19.0,
                humidity: 71.0,
                ph: 5.9,
                ec: 4.1,
                site: site.clone(),
            }],
        );
        let bytes = crate::data::export::environment_parquet(&source).unwrap();
        std::fs::write(tmp.path().join("아라고_환경데이터.parquet"), bytes).unwrap();

        let data = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(data, source);
    }

    #[test]
    fn no_matching_file_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "B_x.csv", ENV_HEADER);

        let env = load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite).unwrap();
        assert_eq!(
            env,
            Availability::Unavailable {
                keyword: "환경데이터".into()
            }
        );
        let growth = load_growth(tmp.path(), "생육결과데이터").unwrap();
        assert!(!growth.is_available());
    }

    #[test]
    fn loads_growth_workbook_one_sheet_per_site() {
        let tmp = tempfile::tempdir().unwrap();
        let decomposed_sheet: String = "동산고".nfd().collect();
        write_growth_workbook(
            tmp.path(),
            "4개교_생육결과데이터.xlsx",
            &[("송도고", &[1.5, 2.5]), (&decomposed_sheet, &[3.0])],
        );

        let data = load_growth(tmp.path(), "생육결과데이터")
            .unwrap()
            .into_result()
            .unwrap();

        let songdo = &data[&SiteId::new("송도고")];
        assert_eq!(songdo.len(), 2);
        assert_eq!(songdo[1].fresh_weight, 2.5);
        assert_eq!(songdo[0].metric("잎 수(장)"), Some(&CellValue::Float(5.0)));
        assert!(songdo[0].metric(FRESH_WEIGHT_COLUMN).is_none());
        assert_eq!(data[&SiteId::new("동산고")][0].site.as_str(), "동산고");
    }

    #[test]
    fn matched_workbook_without_rows_is_available_and_empty() {
        let tmp = tempfile::tempdir().unwrap();
        write_growth_workbook(tmp.path(), "생육결과데이터.xlsx", &[("아라고", &[])]);

        let status = load_growth(tmp.path(), "생육결과데이터").unwrap();
        let data = status.into_result().unwrap();
        assert!(data[&SiteId::new("아라고")].is_empty());
    }

    #[test]
    fn growth_rows_need_numeric_fresh_weight() {
        let site = SiteId::new("송도고");
        let header = vec![
            CellValue::Text("개체번호".into()),
            CellValue::Text(FRESH_WEIGHT_COLUMN.into()),
        ];
        let rows = vec![
            header.clone(),
            vec![CellValue::Integer(1), CellValue::Text("2.25".into())],
            vec![CellValue::Empty, CellValue::Empty],
        ];
        let records = parse_growth_rows("t", &site, &rows).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fresh_weight, 2.25);

        let bad = vec![header, vec![CellValue::Integer(2), CellValue::Empty]];
        assert!(matches!(
            parse_growth_rows("t", &site, &bad),
            Err(DataError::MalformedRow { row: 1, .. })
        ));

        let no_weight = vec![vec![CellValue::Text("개체번호".into())]];
        assert!(matches!(
            parse_growth_rows("t", &site, &no_weight),
            Err(DataError::MissingColumn { .. })
        ));
    }

    #[test]
    fn non_finite_readings_are_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        for bad in ["NaN", "inf", "-inf"] {
            write(
                tmp.path(),
                "A_환경데이터.csv",
                &format!("{ENV_HEADER}2025-05-01,20,50,6,1\n2025-05-02,20,50,6,{bad}\n"),
            );
            assert!(matches!(
                load_environment(tmp.path(), "환경데이터", DuplicateSitePolicy::Overwrite),
                Err(DataError::MalformedRow { row: 2, ref reason, .. }) if reason.contains("ec")
            ));
        }

        let site = SiteId::new("A");
        let mut source = EnvironmentData::new();
        source.insert(
            site.clone(),
            vec![EnvironmentRecord {
                time: parse_timestamp("2025-05-01").unwrap(),
                temperature: f64::NAN,
                humidity: 50.0,
                ph: 6.0,
                ec: 1.0,
                site,
            }],
        );
        let pq = tempfile::tempdir().unwrap();
        let bytes = crate::data::export::environment_parquet(&source).unwrap();
        std::fs::write(pq.path().join("A_환경데이터.parquet"), bytes).unwrap();
        assert!(matches!(
            load_environment(pq.path(), "환경데이터", DuplicateSitePolicy::Overwrite),
            Err(DataError::MalformedRow { row: 1, ref reason, .. }) if reason.contains("temperature")
        ));

        let header = vec![CellValue::Text(FRESH_WEIGHT_COLUMN.into())];
        for cell in [CellValue::Text("NaN".into()), CellValue::Float(f64::INFINITY)] {
            let rows = vec![header.clone(), vec![cell]];
            assert!(matches!(
                parse_growth_rows("t", &SiteId::new("송도고"), &rows),
                Err(DataError::MalformedRow { row: 1, .. })
            ));
        }
    }

    #[test]
    fn timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        for raw in [
            "2025-05-01 09:30:00",
            "2025-05-01T09:30:00",
            "2025-05-01 09:30",
            "2025/05/01 09:30:00",
            "2025-05-01T09:30:00+09:00",
            " 2025-05-01 09:30:00.000 ",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(
            parse_timestamp("2025-05-01"),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("05/01/2025 noon"), None);
    }

    #[test]
    fn site_prefix_of_file_name() {
        assert_eq!(
            site_from_file_name(Path::new("/d/송도고_환경데이터.csv")).as_str(),
            "송도고"
        );
        assert_eq!(site_from_file_name(Path::new("환경데이터.csv")).as_str(), "환경데이터");
    }
}
