use csv::StringRecord;
use serde::de::DeserializeOwned;
use std::io::Read;

/// Rows kept for the target building plus the count of rows filed under other BINs.
#[derive(Debug)]
pub(crate) struct ParsedRows<T> {
    pub(crate) rows: Vec<T>,
    pub(crate) skipped: usize,
}

/// Deserialize an Open Data CSV export into registry records. Headers are normalized so
/// `NOVIssuedDate`, `ISSUE_DATE` and `Job #` all line up with the record field names.
pub(crate) fn parse_rows<T, R>(reader: R, bin: &str) -> Result<ParsedRows<T>, csv::Error>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: StringRecord = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();
    let bin_column = headers.iter().position(|header| header == "bin");

    let mut parsed = ParsedRows {
        rows: Vec::new(),
        skipped: 0,
    };

    for record in csv_reader.records() {
        let record = record?;
        let row_bin = bin_column
            .and_then(|index| record.get(index))
            .filter(|value| !value.is_empty());
        if let Some(row_bin) = row_bin {
            if row_bin != bin {
                parsed.skipped += 1;
                continue;
            }
        }

        parsed.rows.push(record.deserialize(Some(&headers))?);
    }

    Ok(parsed)
}

pub(crate) fn normalize_header(value: &str) -> String {
    value
        .replace(['\u{feff}', '\u{200b}'], "")
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
