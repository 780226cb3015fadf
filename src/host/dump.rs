//! Raw numeric dumps: one row per line, whitespace separated, in the form
//! downstream histogramming and fitting tools load directly.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::units::{SampleTable, StreamRecord};

/// Write one line of four values per table row.
pub fn write_table<W: Write>(out: &mut W, table: &SampleTable) -> io::Result<()> {
    for row in table.rows() {
        writeln!(out, "{:e} {:e} {:e} {:e}", row[0], row[1], row[2], row[3])?;
    }
    Ok(())
}

/// Write one `t adc` line per streamed sample.
pub fn write_stream<W: Write>(out: &mut W, record: &StreamRecord) -> io::Result<()> {
    for (t, adc) in record.t().iter().zip(record.adc()) {
        writeln!(out, "{t:e} {adc:e}")?;
    }
    Ok(())
}

pub fn save_table(path: &Path, table: &SampleTable) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_table(&mut out, table)?;
    out.flush()
}

pub fn save_stream(path: &Path, record: &StreamRecord) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_stream(&mut out, record)?;
    out.flush()
}
