use crate::form::SensorForm;
use crate::types::{FeatureName, SensorReadings, FEATURE_ORDER, NUM_FEATURES};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// CSVファイルからセンサー値を読み込む
///
/// 列はヘッダー名で対応付けるため、ファイル内の列順は特徴量の順序に影響しません。
/// 未知の列は無視します。値はフォーム入力と同じ規則（有限値のみ、N/P/Kは整数に丸める）で検証します。
pub fn load_readings(path: &Path) -> Result<Vec<SensorReadings>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open readings CSV: {}", path.display()))?;
    read_readings(file).with_context(|| format!("Invalid readings CSV: {}", path.display()))
}

pub fn read_readings<R: Read>(input: R) -> Result<Vec<SensorReadings>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();

    // 特徴量 → 列番号
    let mut columns: [Option<usize>; NUM_FEATURES] = [None; NUM_FEATURES];
    for (i, header) in headers.iter().enumerate() {
        if let Some(name) = FeatureName::parse(header) {
            if columns[name.index()].replace(i).is_some() {
                anyhow::bail!("Duplicate column for {}", name);
            }
        }
    }
    if let Some(missing) = FEATURE_ORDER.iter().find(|name| columns[name.index()].is_none()) {
        anyhow::bail!("Missing column: {}", missing);
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let mut readings = SensorReadings::default();

        for name in FEATURE_ORDER {
            let raw = columns[name.index()]
                .and_then(|i| record.get(i))
                .ok_or_else(|| anyhow::anyhow!("Row {}: missing {}", line + 1, name))?;
            let value: f64 = raw
                .parse()
                .with_context(|| format!("Row {}: invalid {} value '{}'", line + 1, name, raw))?;
            readings.set(name, value);
        }

        let mut form = SensorForm::new();
        form.set_all(&readings)
            .with_context(|| format!("Row {}: rejected", line + 1))?;
        rows.push(form.values());
    }

    Ok(rows)
}
