//! In-memory header + records table, the hand-off between loaders and analyses.

use std::io::Read;

use csv::StringRecord;

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    /// Read a delimited file with a header row. Headers and fields are trimmed,
    /// ragged rows (e.g. trailing commas in bhavcopies) are accepted.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Field of `record` at `idx`; short rows read as "".
    pub fn get<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
        record.get(idx).unwrap_or("")
    }

    /// Rename headers by exact match; unknown `from` names are ignored.
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for h in self.headers.iter_mut() {
            if let Some((_, to)) = renames.iter().find(|(from, _)| h == from) {
                *h = (*to).to_string();
            }
        }
    }
}
