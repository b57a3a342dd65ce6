//! Recorded detector output.
//!
//! A recording is a plain concatenation of frame records. Each record is the
//! box tensor followed by the score tensor, both as little-endian f32, exactly
//! as a tensor sink delivers them. Recordings are written with
//! [`write_record`].

use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::detect::{boxes_len, record_len, scores_len, RawDetectionFrame};
use crate::ingest::FrameSource;

pub struct FileSource {
    name: String,
    path: PathBuf,
    reader: BufReader<File>,
    detection_max: usize,
    label_count: usize,
    records_read: u64,
}

impl FileSource {
    pub fn open(path: &Path, detection_max: usize, label_count: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open recording {}", path.display()))?;
        log::info!("FileSource: reading {}", path.display());
        Ok(Self {
            name: path.display().to_string(),
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            detection_max,
            label_count,
            records_read: 0,
        })
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Fill `buf` completely. Returns `false` on a clean end of stream before the first byte.
    fn read_block(&mut self, buf: &mut [u8], allow_eof: bool) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    if filled == 0 && allow_eof {
                        return Ok(false);
                    }
                    bail!(
                        "recording {} ends inside record {}",
                        self.path.display(),
                        self.records_read + 1
                    );
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(anyhow!("failed to read {}: {}", self.path.display(), e));
                }
            }
        }
        Ok(true)
    }
}

impl FrameSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Option<RawDetectionFrame>> {
        let mut boxes = vec![0u8; boxes_len(self.detection_max)];
        if !self.read_block(&mut boxes, true)? {
            return Ok(None);
        }
        let mut scores = vec![0u8; scores_len(self.detection_max, self.label_count)];
        self.read_block(&mut scores, false)?;
        self.records_read += 1;
        RawDetectionFrame::from_le_bytes(&boxes, &scores, self.detection_max, self.label_count)
            .map(Some)
    }
}

/// Append one frame record to `out`.
pub fn write_record<W: Write>(out: &mut W, frame: &RawDetectionFrame) -> Result<()> {
    out.write_all(&frame.to_le_bytes())
        .context("failed to write frame record")
}
