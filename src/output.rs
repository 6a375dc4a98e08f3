use crate::types::EdgeSummary;
use anyhow::{Context, Result};
use csv::Writer;
use std::path::Path;

pub fn write_edges(edges: &[EdgeSummary], path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    // Write header
    wtr.write_record([
        "first_pos",
        "first_symbol",
        "second_pos",
        "second_symbol",
        "first_index",
        "second_index",
        "reads",
        "o11",
        "o12",
        "o21",
        "o22",
        "p_value",
        "p_value_kind",
        "accepted_by",
        "relative_frequency",
        "error_ratio",
        "true_edge",
    ])?;

    // Write data
    for edge in edges {
        let t = &edge.table;
        wtr.write_record(&[
            edge.first.position.to_string(),
            (edge.first_symbol as char).to_string(),
            edge.second.position.to_string(),
            (edge.second_symbol as char).to_string(),
            edge.first_index.to_string(),
            edge.second_index.to_string(),
            t.reads.to_string(),
            t.o11.to_string(),
            t.o12.to_string(),
            t.o21.to_string(),
            t.o22.to_string(),
            format!("{:e}", edge.p_value.value()),
            edge.p_value.kind().to_string(),
            edge.acceptance.as_str().to_string(),
            format!("{:.6}", edge.relative_frequency),
            format!("{:.6}", edge.error_ratio),
            edge.true_edge.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
