//! Connection export: hand similarity results to downstream consumers.
//!
//! The similarity-search subsystem ingests connections as JSON:
//!
//! ```text
//! propagate() → create_connections() → export_json_lines()
//!   → {"source":1,"target":2,"value":0.5}
//!   → {"source":1,"target":3,"value":0.25}
//! ```

use std::io::Write;

use serde::Serialize;

use crate::similarity::SimilarityConnection;
use crate::Result;

/// Write connections as one pretty-printed JSON array.
pub fn export_json<T: Serialize>(
    connections: &[SimilarityConnection<T>],
    writer: &mut dyn Write,
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, connections)?;
    writeln!(writer)?;
    Ok(())
}

/// Write one compact JSON object per line.
pub fn export_json_lines<T: Serialize>(
    connections: &[SimilarityConnection<T>],
    writer: &mut dyn Write,
) -> Result<()> {
    for connection in connections {
        serde_json::to_writer(&mut *writer, connection)?;
        writeln!(writer)?;
    }
    Ok(())
}
