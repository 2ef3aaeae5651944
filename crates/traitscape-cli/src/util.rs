use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use traitscape_community::{
    abundance::abundance_from_records,
    align::{SpeciesAlignment, align_species, check_row_order},
    io as csv_io,
    table::Table,
};

/// Destination of a command's primary result: a file, or stdout when no path is given
#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        serde_json::to_writer_pretty(&mut output, value)
            .with_context(|| format!("Failed to write JSON to {}", output.display_path().display()))?;
        writeln!(&mut output)
            .with_context(|| format!("Failed to write JSON to {}", output.display_path().display()))?;
        output.finish()
    }

    pub fn save_table(table: &Table, output_path: Option<PathBuf>) -> anyhow::Result<()> {
        let mut output = Output::from_output_path(output_path)?;
        let display_path = output.display_path();
        csv_io::write_table_to_writer(&mut output, table, &display_path)?;
        output.finish()
    }

    pub fn save_records<T>(records: &[T], output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        let display_path = output.display_path();
        csv_io::write_records_to_writer(&mut output, records, &display_path)?;
        output.finish()
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(path) = output_path else {
            return Ok(Output::Stdout {
                writer: io::stdout().lock(),
            });
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> PathBuf {
        match self {
            Output::Stdout { .. } => PathBuf::from("stdout"),
            Output::File { path, .. } => path.clone(),
        }
    }

    fn finish(mut self) -> anyhow::Result<()> {
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path().display()))
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Read a wide CSV table
pub fn read_table(table_kind: &str, path: &Path) -> anyhow::Result<Table> {
    let table = csv_io::read_table(path)
        .with_context(|| format!("Failed to read {table_kind} table: {}", path.display()))?;
    eprintln!(
        "Loaded {table_kind} table: {} rows x {} columns",
        table.nrows(),
        table.ncols()
    );
    Ok(table)
}

/// Read an abundance table, either wide (plots x species, missing cells are
/// zero) or long (plot, species, abundance records)
pub fn read_abundance(path: &Path, long: bool) -> anyhow::Result<Table> {
    if !long {
        let table = csv_io::read_wide_abundance(path)
            .with_context(|| format!("Failed to read abundance table: {}", path.display()))?;
        eprintln!(
            "Loaded abundance table: {} plots x {} species",
            table.nrows(),
            table.ncols()
        );
        return Ok(table);
    }
    let records = csv_io::read_abundance_records(path)
        .with_context(|| format!("Failed to read abundance records: {}", path.display()))?;
    let table = abundance_from_records(&records)
        .with_context(|| format!("Invalid abundance records in {}", path.display()))?;
    eprintln!(
        "Loaded {} abundance records: {} plots x {} species",
        records.len(),
        table.nrows(),
        table.ncols()
    );
    Ok(table)
}

/// Intersect species of abundance and trait tables, warning about dropped species
pub fn align_with_warnings(abundance: &Table, traits: &Table) -> anyhow::Result<SpeciesAlignment> {
    let aligned = align_species(abundance, traits)?;
    if !aligned.dropped_from_abundance.is_empty() {
        eprintln!(
            "WARNING: {} species without trait data dropped: {}",
            aligned.dropped_from_abundance.len(),
            aligned.dropped_from_abundance.join(", ")
        );
    }
    if !aligned.dropped_from_traits.is_empty() {
        eprintln!(
            "WARNING: {} species absent from abundance data dropped: {}",
            aligned.dropped_from_traits.len(),
            aligned.dropped_from_traits.join(", ")
        );
    }
    if aligned.traits.nrows() == 0 {
        anyhow::bail!("No species shared between abundance and trait tables");
    }
    Ok(aligned)
}

/// Warn when two plot tables list their plots in a different order
pub fn warn_plot_order(left_kind: &str, left: &Table, right_kind: &str, right: &Table) {
    if let Some(warning) = check_row_order(left, right).warning() {
        eprintln!("{warning} ({left_kind} vs {right_kind})");
    }
}

/// Seeded RNG, drawing and reporting a seed when none is given
pub fn seeded_rng(seed: Option<u64>) -> (Pcg64, u64) {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    eprintln!("Using seed {seed}");
    (Pcg64::seed_from_u64(seed), seed)
}
