//! Tab-separated graph input.
//!
//! The first row of every file is a header; its column names are echoed so
//! a misconfigured column index is visible immediately. Records with a
//! column count different from the header are skipped and counted. Node and
//! edge types may be composites of several columns, joined with `_`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use ddcsbm::GraphStats;
use flate2::read::GzDecoder;
use log::{debug, info};

/// Which files to read and which columns to pick the graph out of.
#[derive(Debug, Clone)]
pub struct TsvConfig {
    pub node_files: Vec<String>,
    pub edge_files: Vec<String>,
    /// Column holding the unique node id.
    pub node_id_col: usize,
    /// Columns whose values compose the node type.
    pub node_type_cols: Vec<usize>,
    /// Column holding the edge's source node id.
    pub source_col: usize,
    /// Column holding the edge's target node id.
    pub target_col: usize,
    /// Columns whose values compose the edge type.
    pub edge_type_cols: Vec<usize>,
}

impl Default for TsvConfig {
    fn default() -> Self {
        TsvConfig {
            node_files: Vec::new(),
            edge_files: Vec::new(),
            node_id_col: 0,
            node_type_cols: vec![1],
            source_col: 0,
            target_col: 1,
            edge_type_cols: vec![2],
        }
    }
}

/// Open a plain or gzipped file for buffered reading.
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file =
        File::open(input_file).with_context(|| format!("error opening file '{input_file}'"))?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

fn strip_cr(mut line: String) -> String {
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

fn check_column(path: &str, what: &str, index: usize, available: usize) -> anyhow::Result<()> {
    if index >= available {
        bail!(
            "'{path}' does not define enough columns to read the {what} at index {index}: \
             expected at least {} columns, got {available}",
            index + 1
        );
    }
    Ok(())
}

fn compose_key(columns: &[&str], indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| columns[i])
        .collect::<Vec<_>>()
        .join("_")
}

/// Read every configured node and edge file into `stats`.
pub fn read_graph(config: &TsvConfig, stats: &mut GraphStats) -> anyhow::Result<()> {
    for path in &config.node_files {
        read_node_file(path, config, stats)?;
    }
    for path in &config.edge_files {
        read_edge_file(path, config, stats)?;
    }
    Ok(())
}

fn read_node_file(path: &str, config: &TsvConfig, stats: &mut GraphStats) -> anyhow::Result<()> {
    info!("reading node file '{path}'");
    let mut lines = open_buf_reader(path)?.lines();
    let header = match lines.next() {
        Some(line) => strip_cr(line?),
        None => bail!("node file '{path}' is empty"),
    };
    let columns: Vec<&str> = header.split('\t').collect();
    let expected = columns.len();

    check_column(path, "node id", config.node_id_col, expected)?;
    for &col in &config.node_type_cols {
        check_column(path, "node type", col, expected)?;
    }
    info!(
        "reading the unique node id from column '{}'",
        columns[config.node_id_col]
    );
    info!(
        "reading the node type as a composite of column(s) {}",
        config
            .node_type_cols
            .iter()
            .map(|&c| format!("'{}'", columns[c]))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut read: u64 = 0;
    let mut skipped: u64 = 0;
    for line in lines {
        let line = strip_cr(line?);
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != expected {
            skipped += 1;
            debug!("skipping invalid line: '{line}'");
            continue;
        }
        let node_type = compose_key(&fields, &config.node_type_cols);
        stats.observe_node(fields[config.node_id_col], &node_type);
        read += 1;
    }
    info!("read {read} node(s) from '{path}', skipped {skipped} line(s)");
    Ok(())
}

fn read_edge_file(path: &str, config: &TsvConfig, stats: &mut GraphStats) -> anyhow::Result<()> {
    info!("reading edge file '{path}'");
    let mut lines = open_buf_reader(path)?.lines();
    let header = match lines.next() {
        Some(line) => strip_cr(line?),
        None => bail!("edge file '{path}' is empty"),
    };
    let columns: Vec<&str> = header.split('\t').collect();
    let expected = columns.len();

    check_column(path, "source node id", config.source_col, expected)?;
    check_column(path, "target node id", config.target_col, expected)?;
    for &col in &config.edge_type_cols {
        check_column(path, "edge type", col, expected)?;
    }
    info!(
        "reading the source node id from column '{}' and the target node id from column '{}'",
        columns[config.source_col], columns[config.target_col]
    );
    info!(
        "reading the edge type as a composite of column(s) {}",
        config
            .edge_type_cols
            .iter()
            .map(|&c| format!("'{}'", columns[c]))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut read: u64 = 0;
    let mut skipped: u64 = 0;
    for line in lines {
        let line = strip_cr(line?);
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != expected {
            skipped += 1;
            debug!("skipping invalid line: '{line}'");
            continue;
        }
        let edge_type = compose_key(&fields, &config.edge_type_cols);
        stats.observe_edge(
            fields[config.source_col],
            fields[config.target_col],
            &edge_type,
        );
        read += 1;
    }
    info!("read {read} edge(s) from '{path}', skipped {skipped} line(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn malformed_records_are_skipped() {
        let nodes = write_temp("id\ttype\nn1\tA\nbroken-line\nn2\tB\n");
        let config = TsvConfig {
            node_files: vec![nodes.path().to_str().unwrap().to_string()],
            ..TsvConfig::default()
        };
        let mut stats = GraphStats::new();
        read_graph(&config, &mut stats).unwrap();

        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.node_type_of("n1"), "A");
        assert_eq!(stats.node_type_of("n2"), "B");
    }

    #[test]
    fn composite_types_join_columns_with_underscores() {
        let nodes = write_temp("id\tkind\tregion\nn1\tuser\teu\n");
        let config = TsvConfig {
            node_files: vec![nodes.path().to_str().unwrap().to_string()],
            node_type_cols: vec![1, 2],
            ..TsvConfig::default()
        };
        let mut stats = GraphStats::new();
        read_graph(&config, &mut stats).unwrap();
        assert_eq!(stats.node_type_of("n1"), "user_eu");
    }

    #[test]
    fn out_of_range_column_is_fatal() {
        let nodes = write_temp("id\ttype\nn1\tA\n");
        let config = TsvConfig {
            node_files: vec![nodes.path().to_str().unwrap().to_string()],
            node_type_cols: vec![5],
            ..TsvConfig::default()
        };
        let mut stats = GraphStats::new();
        assert!(read_graph(&config, &mut stats).is_err());
    }

    #[test]
    fn edges_feed_the_transition_matrix() {
        let nodes = write_temp("id\ttype\na\tA\nb\tB\n");
        let edges = write_temp("src\tdst\trel\na\tb\tlikes\r\na\tb\tlikes\n");
        let config = TsvConfig {
            node_files: vec![nodes.path().to_str().unwrap().to_string()],
            edge_files: vec![edges.path().to_str().unwrap().to_string()],
            ..TsvConfig::default()
        };
        let mut stats = GraphStats::new();
        read_graph(&config, &mut stats).unwrap();

        assert_eq!(stats.type_pair_count("likes", "A", "B"), 2);
        assert_eq!(stats.out_degrees["likes"]["a"], 2);
    }
}
