//! CSV input and output
//!
//! Three layouts are supported:
//!
//! - **wide tables**: the first column holds row names (its header is ignored),
//!   the remaining headers are column names; wide abundance tables read missing
//!   cells as zero
//! - **long abundance records**: `plot`, `species` and `abundance` columns in any
//!   order, matched case-insensitively; extra columns are ignored
//! - **individuals**: `plot` and `species` columns, an optional `id` column, and
//!   one column per trait
//!
//! Missing numeric values are written as `NA`; `NA`, `NaN` and empty cells are
//! read back as missing. Every error names the file it came from. The
//! `*_from_reader`/`*_to_writer` variants take the path only for error messages.

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use traitscape_stats::linalg::Matrix;

use crate::{
    CommunityError, Result,
    abundance::{AbundanceRecord, abundance_from_wide},
    individual::{Individual, IndividualTable},
    table::Table,
};

const MISSING: &str = "NA";

pub fn read_table(path: &Path) -> Result<Table> {
    read_table_from_reader(open(path)?, path)
}

pub fn read_table_from_reader<R: Read>(reader: R, path: &Path) -> Result<Table> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let col_names = headers.iter().skip(1).map(str::to_owned).collect::<Vec<_>>();

    let mut row_names = vec![];
    let mut data = vec![];
    for record in reader.records() {
        let record = record.map_err(csv_error(path))?;
        let line = line_of(&record);
        row_names.push(record.get(0).unwrap_or_default().to_owned());
        for (value, column) in record.iter().skip(1).zip(&col_names) {
            data.push(parse_value(value, path, line, column)?.unwrap_or(f64::NAN));
        }
    }
    let values = Matrix::from_vec(row_names.len(), col_names.len(), data)?;
    Table::new(row_names, col_names, values)
}

/// Reads a wide plots × species abundance table; see
/// [`abundance_from_wide`] for how cells are checked.
pub fn read_wide_abundance(path: &Path) -> Result<Table> {
    read_wide_abundance_from_reader(open(path)?, path)
}

pub fn read_wide_abundance_from_reader<R: Read>(reader: R, path: &Path) -> Result<Table> {
    abundance_from_wide(read_table_from_reader(reader, path)?)
}

pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    write_table_to_writer(create(path)?, table, path)
}

pub fn write_table_to_writer<W: Write>(writer: W, table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let header = std::iter::once("id").chain(table.col_names().iter().map(String::as_str));
    writer.write_record(header).map_err(csv_error(path))?;
    for (r, name) in table.row_names().iter().enumerate() {
        let mut record = vec![name.clone()];
        record.extend(table.row(r).iter().map(|v| format_value(*v)));
        writer.write_record(&record).map_err(csv_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

pub fn read_abundance_records(path: &Path) -> Result<Vec<AbundanceRecord>> {
    read_abundance_records_from_reader(open(path)?, path)
}

pub fn read_abundance_records_from_reader<R: Read>(
    reader: R,
    path: &Path,
) -> Result<Vec<AbundanceRecord>> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let plot = required_column(&headers, "plot", path)?;
    let species = required_column(&headers, "species", path)?;
    let abundance = required_column(&headers, "abundance", path)?;

    let mut records = vec![];
    for record in reader.records() {
        let record = record.map_err(csv_error(path))?;
        let line = line_of(&record);
        let value = record.get(abundance).unwrap_or_default();
        let parsed = parse_value(value, path, line, "abundance")?.ok_or_else(|| {
            CommunityError::Parse {
                path: path.to_owned(),
                line,
                column: "abundance".to_owned(),
                value: value.to_owned(),
            }
        })?;
        records.push(AbundanceRecord::new(
            record.get(plot).unwrap_or_default(),
            record.get(species).unwrap_or_default(),
            parsed,
        ));
    }
    Ok(records)
}

pub fn write_abundance_records(path: &Path, records: &[AbundanceRecord]) -> Result<()> {
    write_records(path, records)
}

pub fn read_individuals(path: &Path) -> Result<IndividualTable> {
    read_individuals_from_reader(open(path)?, path)
}

/// Reads individuals; rows without an `id` column are numbered from 1.
pub fn read_individuals_from_reader<R: Read>(reader: R, path: &Path) -> Result<IndividualTable> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let plot = required_column(&headers, "plot", path)?;
    let species = required_column(&headers, "species", path)?;
    let id = find_column(&headers, "id");
    let trait_columns = (0..headers.len())
        .filter(|i| *i != plot && *i != species && Some(*i) != id)
        .collect::<Vec<_>>();

    let mut table = IndividualTable::new(
        trait_columns
            .iter()
            .map(|i| headers[*i].to_owned())
            .collect(),
    );
    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let line = line_of(&record);
        let traits = trait_columns
            .iter()
            .map(|i| parse_value(record.get(*i).unwrap_or_default(), path, line, &headers[*i]))
            .collect::<Result<Vec<_>>>()?;
        let id = match id {
            Some(i) => record.get(i).unwrap_or_default().to_owned(),
            None => (n + 1).to_string(),
        };
        table.push(Individual {
            id,
            plot: record.get(plot).unwrap_or_default().to_owned(),
            species: record.get(species).unwrap_or_default().to_owned(),
            traits,
        })?;
    }
    Ok(table)
}

pub fn write_individuals(path: &Path, individuals: &IndividualTable) -> Result<()> {
    write_individuals_to_writer(create(path)?, individuals, path)
}

pub fn write_individuals_to_writer<W: Write>(
    writer: W,
    individuals: &IndividualTable,
    path: &Path,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let header = ["id", "plot", "species"]
        .into_iter()
        .chain(individuals.trait_names().iter().map(String::as_str));
    writer.write_record(header).map_err(csv_error(path))?;
    for ind in individuals.individuals() {
        let mut record = vec![ind.id.clone(), ind.plot.clone(), ind.species.clone()];
        record.extend(
            ind.traits
                .iter()
                .map(|v| v.map_or_else(|| MISSING.to_owned(), format_value)),
        );
        writer.write_record(&record).map_err(csv_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

/// Writes any serializable records with a header row derived from field names.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    write_records_to_writer(create(path)?, records, path)
}

pub fn write_records_to_writer<W: Write, T: Serialize>(
    writer: W,
    records: &[T],
    path: &Path,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record).map_err(csv_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(io_error(path))
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(io_error(path))
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CommunityError + '_ {
    move |source| CommunityError::Io {
        path: path.to_owned(),
        source,
    }
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> CommunityError + '_ {
    move |source| CommunityError::Csv {
        path: path.to_owned(),
        source,
    }
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn required_column(headers: &csv::StringRecord, name: &'static str, path: &Path) -> Result<usize> {
    find_column(headers, name).ok_or_else(|| CommunityError::MissingColumn {
        path: PathBuf::from(path),
        column: name,
    })
}

fn parse_value(value: &str, path: &Path, line: u64, column: &str) -> Result<Option<f64>> {
    if value.is_empty() || value.eq_ignore_ascii_case(MISSING) || value.eq_ignore_ascii_case("nan")
    {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| CommunityError::Parse {
            path: path.to_owned(),
            line,
            column: column.to_owned(),
            value: value.to_owned(),
        })
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        MISSING.to_owned()
    } else {
        value.to_string()
    }
}
