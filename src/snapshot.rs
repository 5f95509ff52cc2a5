//! Persisting the frame.  Each snapshot is written to a temporary file
//! beside the destination and then renamed over it, so a reader never
//! sees a half-written image, and a failed write leaves the previous
//! snapshot in place.

use image::png::PNGEncoder;
use image::ColorType;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use error::RenderError;
use frame::FrameBuffer;

/// Somewhere the assembler can put the frame.  Called only from the
/// assembler thread.
pub trait SnapshotSink: Send {
    /// Persist the frame as it stands now.
    fn save(&mut self, frame: &FrameBuffer) -> Result<(), RenderError>;
}

impl<'a, S: SnapshotSink + ?Sized> SnapshotSink for &'a mut S {
    fn save(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        (**self).save(frame)
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for Box<S> {
    fn save(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        (**self).save(frame)
    }
}

/// Write the binary PPM form of `frame`: a three-line text header
/// followed by the raw RGB bytes.
pub fn write_ppm<W: Write>(out: &mut W, frame: &FrameBuffer) -> io::Result<()> {
    write!(out, "P6\n{} {}\n255\n", frame.width(), frame.height())?;
    out.write_all(frame.as_bytes())
}

// Run `write` against a temporary file next to `path`, then move it
// into place.
fn replace_atomically<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<&mut ::std::fs::File>) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write `frame` to `path` as a binary PPM, replacing any previous
/// snapshot.
pub fn save_snapshot(frame: &FrameBuffer, path: &Path) -> Result<(), RenderError> {
    replace_atomically(path, |out| write_ppm(out, frame))
        .map_err(|e| RenderError::Snapshot(path.display().to_string(), e))
}

/// Snapshots as binary PPM files.
#[derive(Debug, Clone)]
pub struct PpmFile {
    path: PathBuf,
}

impl PpmFile {
    /// Snapshots will replace the file at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PpmFile { path: path.into() }
    }

    /// The destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for PpmFile {
    fn save(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        save_snapshot(frame, &self.path)
    }
}

/// Snapshots as PNG files, for when the output is meant to be viewed
/// rather than piped elsewhere.
#[derive(Debug, Clone)]
pub struct PngFile {
    path: PathBuf,
}

impl PngFile {
    /// Snapshots will replace the file at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PngFile { path: path.into() }
    }
}

impl SnapshotSink for PngFile {
    fn save(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        replace_atomically(&self.path, |out| {
            PNGEncoder::new(out).encode(
                frame.as_bytes(),
                frame.width() as u32,
                frame.height() as u32,
                ColorType::RGB(8),
            )
        })
        .map_err(|e| RenderError::Snapshot(self.path.display().to_string(), e))
    }
}

/// Pick a sink from the destination's extension: `.png` gets PNG, anything
/// else gets PPM.
pub fn sink_for(path: &Path) -> Box<dyn SnapshotSink> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if is_png {
        Box::new(PngFile::new(path))
    } else {
        Box::new(PpmFile::new(path))
    }
}
