use anyhow::Context;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for reading; `stdin` reads the standard input and `.gz` files
/// are decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("pairs.tsv");
/// std::fs::write(&path, "a\nb\nc\n").unwrap();
///
/// let reader = pepbind::reader(path.to_str().unwrap()).unwrap();
/// assert_eq!(reader.lines().count(), 3);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
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

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Read;

    #[test]
    fn test_reader_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.tsv.gz");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut encoder = GzEncoder::new(file, flate2::Compression::default());
            writeln!(encoder, "cdr_resnames").unwrap();
            encoder.finish().unwrap();
        }

        let mut content = String::new();
        reader(path.to_str().unwrap())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "cdr_resnames\n");
    }

    #[test]
    fn test_reader_missing_file() {
        let res = reader("tests/does/not/exist.tsv");
        assert!(res.is_err());
    }

    #[test]
    fn test_writer_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        {
            let mut w = writer(path.to_str().unwrap()).unwrap();
            writeln!(w, "line").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }
}
