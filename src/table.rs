use crate::fit::TelemetryRecord;

/// Row-oriented container for telemetry samples, kept in source order.
///
/// This is deliberately small: the extraction pipeline only needs append,
/// forward-fill, and a half-open timestamp trim.
#[derive(Debug, Default)]
pub struct TelemetryTable {
    rows: Vec<TelemetryRecord>,
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: TelemetryRecord) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[TelemetryRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fill each missing optional value from the most recent prior row that
    /// had one. Leading gaps stay empty; there is no backward fill.
    pub fn forward_fill(&mut self) {
        let mut last = TelemetryRecord::default();
        for row in &mut self.rows {
            fill(&mut row.timestamp, &mut last.timestamp);
            fill(&mut row.utc_timestamp, &mut last.utc_timestamp);
            fill(&mut row.latitude_deg, &mut last.latitude_deg);
            fill(&mut row.longitude_deg, &mut last.longitude_deg);
            fill(&mut row.altitude_m, &mut last.altitude_m);
            fill(&mut row.speed_mps, &mut last.speed_mps);
        }
    }

    /// Keep only rows whose timestamp lies in the half-open window
    /// `[start, end)`. A sample stamped exactly at `end` is dropped, and rows
    /// without a timestamp cannot be windowed so they are dropped too.
    pub fn retain_window(&mut self, start: i64, end: i64) {
        self.rows
            .retain(|row| row.timestamp.is_some_and(|ts| ts >= start && ts < end));
    }
}

fn fill<T: Copy>(value: &mut Option<T>, last: &mut Option<T>) {
    match value {
        Some(v) => *last = Some(*v),
        None => *value = *last,
    }
}

impl IntoIterator for TelemetryTable {
    type Item = TelemetryRecord;
    type IntoIter = std::vec::IntoIter<TelemetryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl FromIterator<TelemetryRecord> for TelemetryTable {
    fn from_iter<I: IntoIterator<Item = TelemetryRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: Option<i64>, altitude_m: Option<f64>) -> TelemetryRecord {
        TelemetryRecord {
            timestamp,
            altitude_m,
            ..TelemetryRecord::default()
        }
    }

    #[test]
    fn window_is_half_open() {
        let mut table: TelemetryTable = [10, 20, 30, 40]
            .into_iter()
            .map(|ts| row(Some(ts), None))
            .collect();

        table.retain_window(20, 40);

        let kept: Vec<_> = table.rows().iter().map(|r| r.timestamp).collect();
        assert_eq!(kept, vec![Some(20), Some(30)]);
    }

    #[test]
    fn rows_without_timestamp_are_dropped_by_trim() {
        let mut table: TelemetryTable =
            [row(Some(5), None), row(None, Some(7.0)), row(Some(6), None)]
                .into_iter()
                .collect();

        table.retain_window(0, 100);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn forward_fill_carries_last_seen_value() {
        let mut table: TelemetryTable = [
            row(Some(1), Some(100.0)),
            row(Some(2), None),
            row(Some(3), None),
        ]
        .into_iter()
        .collect();

        table.forward_fill();

        for r in table.rows() {
            assert_eq!(r.altitude_m, Some(100.0));
        }
    }

    #[test]
    fn leading_gap_stays_empty() {
        let mut table: TelemetryTable = [
            row(Some(1), None),
            row(Some(2), Some(50.0)),
            row(Some(3), None),
        ]
        .into_iter()
        .collect();

        table.forward_fill();

        let alts: Vec<_> = table.rows().iter().map(|r| r.altitude_m).collect();
        assert_eq!(alts, vec![None, Some(50.0), Some(50.0)]);
    }

    #[test]
    fn fill_updates_across_interleaved_fields() {
        let mut table = TelemetryTable::new();
        table.push(TelemetryRecord {
            timestamp: Some(1),
            speed_mps: Some(2.0),
            ..TelemetryRecord::default()
        });
        table.push(TelemetryRecord {
            timestamp: Some(2),
            altitude_m: Some(10.0),
            ..TelemetryRecord::default()
        });
        table.push(TelemetryRecord {
            timestamp: Some(3),
            ..TelemetryRecord::default()
        });

        table.forward_fill();

        let last = &table.rows()[2];
        assert_eq!(last.speed_mps, Some(2.0));
        assert_eq!(last.altitude_m, Some(10.0));
    }
}
