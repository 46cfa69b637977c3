use super::errors::{FragError, Result};
use flate2::write;
use flate2::Compression;
use rust_htslib::bam::{self, Read};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write normal or compressed files seamlessly
/// Uses the presence of a `.gz` extension to decide, `-` is stdout
pub fn writer(filename: &str) -> Result<Box<dyn Write>> {
    if filename == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let path = Path::new(filename);
    let file = File::create(path)?;

    if path.extension() == Some(OsStr::new("gz")) {
        Ok(Box::new(BufWriter::with_capacity(
            128 * 1024,
            write::GzEncoder::new(file, Compression::default()),
        )))
    } else {
        Ok(Box::new(BufWriter::with_capacity(128 * 1024, file)))
    }
}

/// Open a sam/bam/cram file, `-` reads stdin.
pub fn bam_reader(path: &str, threads: usize) -> Result<bam::Reader> {
    let open = |source| FragError::Open {
        path: path.to_string(),
        source,
    };
    let mut bam = if path == "-" {
        bam::Reader::from_stdin().map_err(open)?
    } else {
        bam::Reader::from_path(path).map_err(open)?
    };
    if threads > 1 {
        bam.set_threads(threads)?;
    }
    Ok(bam)
}

/// The input header copied verbatim, plus a PG line for this program.
pub fn header_with_pg(template: &bam::HeaderView, program: &str) -> bam::Header {
    let mut header = bam::Header::from_template(template);
    let mut pg_line = bam::header::HeaderRecord::new(b"PG");
    pg_line.push_tag(b"ID", program);
    pg_line.push_tag(b"PN", env!("CARGO_PKG_NAME"));
    pg_line.push_tag(b"VN", env!("CARGO_PKG_VERSION"));
    // get the full command line call as a string
    let full_cmd = std::env::args()
        .map(|arg| arg.replace(' ', "\\ "))
        .collect::<Vec<String>>()
        .join(" ");
    pg_line.push_tag(b"CL", full_cmd);
    header.push_record(&pg_line);
    header
}

/// Create a BAM writer, `-` writes to stdout.
pub fn bam_writer(path: &str, header: &bam::Header, threads: usize) -> Result<bam::Writer> {
    let open = |source| FragError::Open {
        path: path.to_string(),
        source,
    };
    let mut writer = if path == "-" {
        bam::Writer::from_stdout(header, bam::Format::Bam).map_err(open)?
    } else {
        bam::Writer::from_path(path, header, bam::Format::Bam).map_err(open)?
    };
    if threads > 1 {
        writer.set_threads(threads)?;
    }
    Ok(writer)
}

