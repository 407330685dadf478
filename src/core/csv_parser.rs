use crate::domain::model::RawRecord;

fn clean_field(raw: &str) -> String {
    raw.trim().replace('"', "")
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(clean_field).collect()
}

/// Parses comma-separated text whose first line is the header.
///
/// Values are kept as strings. A data line is accepted only when it has
/// exactly as many fields as the header; other lines are dropped. Commas
/// inside quotes are not supported: every comma separates fields.
pub fn parse_csv(text: &str) -> Vec<RawRecord> {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let headers = split_line(lines[0]);
    let mut records = Vec::with_capacity(lines.len() - 1);
    let mut dropped = 0usize;

    for (index, line) in lines.iter().enumerate().skip(1) {
        let values = split_line(line);
        if values.len() != headers.len() {
            dropped += 1;
            tracing::debug!(
                "Dropping line {}: {} fields, header has {}",
                index + 1,
                values.len(),
                headers.len()
            );
            continue;
        }

        records.push(headers.iter().cloned().zip(values).collect());
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} malformed CSV line(s)", dropped);
    }

    records
}
