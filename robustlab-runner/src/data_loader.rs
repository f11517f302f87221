//! Data loading for robustness analysis.
//!
//! Two CSV layouts are accepted, detected from the header:
//! - bar files: `date,open,high,low,close[,volume]`, turned into
//!   close-to-close returns
//! - return files: `date,return[,prediction]`
//!
//! Synthetic data is a developer mode. Datasets built from it are tagged
//! `DataSource::Synthetic` so reports can say so.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use robustlab_core::domain::bar::closes;
use robustlab_core::domain::{returns_from_prices, Bar, DatasetHash};
use robustlab_core::synthetic::{generate_bars, SyntheticConfig, SyntheticError};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}' (expected a bar file with date,open,high,low,close or a return file with date,return)")]
    MissingColumn(String),

    #[error("line {line}: cannot parse {column} value '{value}'")]
    Parse {
        line: usize,
        column: String,
        value: String,
    },

    #[error("no usable observations in input")]
    Empty,

    #[error(transparent)]
    Synthetic(#[from] SyntheticError),
}

/// Where a dataset came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { seed: u64 },
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic { .. })
    }
}

/// A dated return series with optional model predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Date of each return (the later bar of each close-to-close pair).
    pub dates: Vec<NaiveDate>,
    pub returns: Vec<f64>,
    /// Prediction made for each return, if the input carried them.
    pub predictions: Option<Vec<f64>>,
    pub source: DataSource,
    pub dataset_hash: DatasetHash,
}

impl Dataset {
    pub fn new(
        dates: Vec<NaiveDate>,
        returns: Vec<f64>,
        predictions: Option<Vec<f64>>,
        source: DataSource,
    ) -> Self {
        let dataset_hash = DatasetHash::compute(&dates, &returns, predictions.as_deref());
        Self {
            dates,
            returns,
            predictions,
            source,
            dataset_hash,
        }
    }

    pub fn from_bars(bars: &[Bar], source: DataSource) -> Result<Self, LoadError> {
        if bars.len() < 2 {
            return Err(LoadError::Empty);
        }
        let returns = returns_from_prices(&closes(bars));
        let dates = bars[1..].iter().map(|b| b.date).collect();
        Ok(Self::new(dates, returns, None, source))
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

// ─── CSV ─────────────────────────────────────────────────────────────

enum Layout {
    Bars {
        date: usize,
        open: usize,
        high: usize,
        low: usize,
        close: usize,
        volume: Option<usize>,
    },
    Returns {
        date: usize,
        ret: usize,
        prediction: Option<usize>,
    },
}

fn detect_layout(headers: &csv::StringRecord) -> Result<Layout, LoadError> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
    let find = |candidates: &[&str]| names.iter().position(|n| candidates.contains(&n.as_str()));
    let require = |candidates: &[&str]| {
        find(candidates).ok_or_else(|| LoadError::MissingColumn(candidates[0].to_string()))
    };

    let date = require(&["date", "timestamp"])?;
    if find(&["close", "adj_close"]).is_some() {
        Ok(Layout::Bars {
            date,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close", "adj_close"])?,
            volume: find(&["volume"]),
        })
    } else {
        Ok(Layout::Returns {
            date,
            ret: require(&["return", "returns", "ret"])?,
            prediction: find(&["prediction", "predictions", "pred", "signal"]),
        })
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, line: usize, column: &str) -> Result<&'a str, LoadError> {
    record.get(idx).map(str::trim).ok_or_else(|| LoadError::Parse {
        line,
        column: column.to_string(),
        value: String::new(),
    })
}

fn parse_f64(record: &csv::StringRecord, idx: usize, line: usize, column: &str) -> Result<f64, LoadError> {
    let raw = field(record, idx, line, column)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LoadError::Parse {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_date(record: &csv::StringRecord, idx: usize, line: usize) -> Result<NaiveDate, LoadError> {
    let raw = field(record, idx, line, "date")?;
    // datetime stamps keep only their date part
    let day = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| LoadError::Parse {
        line,
        column: "date".to_string(),
        value: raw.to_string(),
    })
}

/// Read a bar or return CSV from any reader.
pub fn read_csv<R: Read>(reader: R, source: DataSource) -> Result<Dataset, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let layout = detect_layout(rdr.headers()?)?;

    match layout {
        Layout::Bars {
            date,
            open,
            high,
            low,
            close,
            volume,
        } => {
            let mut bars = Vec::new();
            for (i, record) in rdr.records().enumerate() {
                let record = record?;
                let line = i + 2;
                let volume = match volume {
                    Some(idx) => parse_f64(&record, idx, line, "volume")?.max(0.0) as u64,
                    None => 0,
                };
                bars.push(Bar {
                    date: parse_date(&record, date, line)?,
                    open: parse_f64(&record, open, line, "open")?,
                    high: parse_f64(&record, high, line, "high")?,
                    low: parse_f64(&record, low, line, "low")?,
                    close: parse_f64(&record, close, line, "close")?,
                    volume,
                });
            }
            let insane = bars.iter().filter(|b| !b.is_sane()).count();
            if insane > 0 {
                warn!(bars = insane, "input contains bars failing OHLC sanity checks");
            }
            Dataset::from_bars(&bars, source)
        }
        Layout::Returns {
            date,
            ret,
            prediction,
        } => {
            let mut dates = Vec::new();
            let mut returns = Vec::new();
            let mut predictions = prediction.map(|_| Vec::new());
            for (i, record) in rdr.records().enumerate() {
                let record = record?;
                let line = i + 2;
                dates.push(parse_date(&record, date, line)?);
                returns.push(parse_f64(&record, ret, line, "return")?);
                if let (Some(idx), Some(preds)) = (prediction, predictions.as_mut()) {
                    preds.push(parse_f64(&record, idx, line, "prediction")?);
                }
            }
            if returns.is_empty() {
                return Err(LoadError::Empty);
            }
            Ok(Dataset::new(dates, returns, predictions, source))
        }
    }
}

/// Load a bar or return CSV file.
pub fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let file = File::open(path)?;
    let dataset = read_csv(
        file,
        DataSource::Csv {
            path: path.to_path_buf(),
        },
    )?;
    info!(
        path = %path.display(),
        observations = dataset.len(),
        predictions = dataset.predictions.is_some(),
        dataset = dataset.dataset_hash.short(12),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Generate synthetic bars and turn them into a dataset.
pub fn synthetic_dataset(config: &SyntheticConfig) -> Result<Dataset, LoadError> {
    let bars = generate_bars(config)?;
    warn!(
        bars = bars.len(),
        seed = config.seed,
        "using synthetic data; results do not describe a real market"
    );
    Dataset::from_bars(&bars, DataSource::Synthetic { seed: config.seed })
}

/// Write bars as `date,open,high,low,close,volume`.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for bar in bars {
        wtr.serialize(bar)?;
    }
    wtr.flush()?;
    Ok(())
}
