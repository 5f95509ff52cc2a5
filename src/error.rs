//! The one error type shared by every stage of the render.  Setup
//! errors are fatal and surface from `render()`; snapshot and tile
//! errors are absorbed by the pipeline and only show up in logs and in
//! the counters of the final report.

use std::io;

/// Everything that can go wrong while rendering.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The render configuration is unusable.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// A shared buffer (named by the first field) of the given number of
    /// elements could not be reserved.
    #[fail(display = "could not allocate {} ({} elements)", _0, _1)]
    Allocation(&'static str, usize),

    /// Writing a snapshot to the named destination failed.
    #[fail(display = "could not write snapshot to {}: {}", _0, _1)]
    Snapshot(String, #[cause] io::Error),

    /// The renderer could not produce the tile with the given id.
    #[fail(display = "tile {} failed to render: {}", _0, _1)]
    Tile(usize, String),

    /// A pipeline thread died outside of the guarded render call.
    #[fail(display = "{} thread panicked", _0)]
    ThreadPanic(&'static str),
}

/// Reserve exactly `len` elements, or report which buffer could not be
/// had.  Used for every buffer that must exist before threads start.
pub fn reserve<T>(what: &'static str, len: usize) -> Result<Vec<T>, RenderError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| RenderError::Allocation(what, len))?;
    Ok(buffer)
}
