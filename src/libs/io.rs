use anyhow::Context;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

/// ```
/// use std::io::BufRead;
/// let reader = mulrfs::reader("tests/data/g2s.map").unwrap();
/// assert_eq!(reader.lines().count(), 5);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if input == "stdin" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }

    let path = std::path::Path::new(input);
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open {}", path.display()))?;

    if path.extension() == Some(std::ffi::OsStr::new("gz")) {
        Ok(Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(
            file,
        ))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// ```
/// let lines = mulrfs::read_lines("tests/data/g2s.map").unwrap();
/// assert_eq!(lines.len(), 5);
/// ```
pub fn read_lines(input: &str) -> anyhow::Result<Vec<String>> {
    let mut s = String::new();
    reader(input)?
        .read_to_string(&mut s)
        .with_context(|| format!("could not read {}", input))?;
    Ok(s.lines().map(|l| l.to_string()).collect())
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}
