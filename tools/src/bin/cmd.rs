// Command line utility for running the traj-rs pipeline

use anyhow::{Context, Error};
use clap::{value_parser, Arg, ArgAction, Command};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};
use std::fs::{create_dir, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use traj_graph::{assign_cells, assign_pseudotime, select_root, TrajectoryGraph};
use traj_rs::cluster::{centroids, kmeans};
use traj_rs::dim_red::run_pca;
use traj_rs::metadata::{load_cell_metadata, load_gene_metadata};
use traj_rs::mtx::load_mtx;
use traj_rs::normalization::{log_normalize, Normalization};
use traj_types::matrix::CountMatrix;

const PCA_POWER_ITERATIONS: usize = 5;
const KMEANS_MAX_ITERATIONS: usize = 300;

pub fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("traj-rs-cmd")
        .arg(
            Arg::new("INPUT")
                .help("Gzipped genes x cells mtx file to use")
                .required(true)
                .index(1)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("CELLS")
                .help("Cell metadata csv (barcode[,batch][,timepoint][,cell_type])")
                .long("cells")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("GENES")
                .help("Gene metadata csv (gene_id,gene_symbol)")
                .long("genes")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("OUT_DIR")
                .help("Output directory")
                .short('o')
                .long("out_dir")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("NORMALIZATION")
                .help("Normalization method to use")
                .short('n')
                .long("norm")
                .default_value("medianlog2")
                .value_parser(["medianlog2", "log1p10k", "plainlog2"]),
        )
        .arg(
            Arg::new("NUM_PCS")
                .help("Number of PCA dimensions to use")
                .short('d')
                .long("num_pcs")
                .default_value("10")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("CLUSTERS")
                .help("Number of k-means clusters (trajectory graph nodes)")
                .short('k')
                .long("clusters")
                .default_value("8")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("ROOT")
                .help("Root node index; selected from timepoint labels when omitted")
                .long("root")
                .action(ArgAction::Append)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("MAX_EDGE_LEN")
                .help("Drop trajectory edges longer than this, splitting partitions")
                .long("max_edge_len")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("SEED")
                .help("Random seed for PCA and clustering")
                .long("seed")
                .default_value("0")
                .value_parser(value_parser!(u64)),
        )
        .get_matches();

    let mtx_filename: &PathBuf = matches.get_one("INPUT").unwrap();
    let cells_filename: &PathBuf = matches.get_one("CELLS").unwrap();
    let genes_filename: &PathBuf = matches.get_one("GENES").unwrap();
    let out_dir: &PathBuf = matches.get_one("OUT_DIR").unwrap();
    let normalization: Normalization = matches.get_one::<String>("NORMALIZATION").unwrap().parse()?;
    let num_pcs: usize = *matches.get_one("NUM_PCS").unwrap();
    let clusters: usize = *matches.get_one("CLUSTERS").unwrap();
    let roots: Vec<usize> = matches
        .get_many::<usize>("ROOT")
        .map(|v| v.copied().collect())
        .unwrap_or_default();
    let max_edge_len: Option<f64> = matches.get_one("MAX_EDGE_LEN").copied();
    let seed: u64 = *matches.get_one("SEED").unwrap();

    if !out_dir.exists() {
        create_dir(out_dir).with_context(|| out_dir.display().to_string())?;
    }

    let raw = load_mtx(mtx_filename)?;
    let genes = load_gene_metadata(genes_filename)?;
    let matrix = CountMatrix::new(
        mtx_filename.display().to_string(),
        load_barcodes_via_metadata(cells_filename, raw.cols())?,
        genes.iter().map(|g| g.gene_id.clone()).collect(),
        genes.iter().map(|g| g.gene_symbol.clone()).collect(),
        raw,
    )?;
    let meta = load_cell_metadata(cells_filename, &matrix)?;
    info!("loaded {} genes x {} cells", matrix.genes(), matrix.cells());

    let norm = log_normalize(&matrix.matrix, normalization, None);
    let cell_by_gene = norm.t().to_owned();
    let pca = run_pca(&cell_by_gene.view(), num_pcs, PCA_POWER_ITERATIONS, seed)?;
    let labels = kmeans(&pca.coords.view(), clusters, KMEANS_MAX_ITERATIONS, seed)?;
    let centers = centroids(&pca.coords.view(), &labels, clusters)?;
    let graph = TrajectoryGraph::from_centroids_mst(&centers, max_edge_len)?;
    info!(
        "trajectory graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let assignments = assign_cells(&graph, &pca.coords)?;
    let roots = if roots.is_empty() {
        let time_labels = meta.time_labels();
        vec![select_root(&graph, &assignments, &time_labels)?]
    } else {
        roots
    };
    let outcome = assign_pseudotime(&graph, &assignments, &roots)?;
    for p in &outcome.unreachable_partitions {
        warn!("partition {} has no reachable root; its cells have undefined pseudotime", p);
    }

    write_embedding(&pca.coords, &matrix.cell_barcodes, out_dir.join("embedding.csv.gz"))?;
    write_clusters(&labels, &matrix.cell_barcodes, out_dir.join("clusters.csv.gz"))?;
    write_edges(&graph, out_dir.join("graph_edges.csv.gz"))?;
    write_pseudotime(
        &outcome.pseudotime.values,
        &matrix.cell_barcodes,
        out_dir.join("pseudotime.csv.gz"),
    )?;

    Ok(())
}

// Pre-pass over the cell metadata just to recover matrix column order:
// mtx files carry no barcodes, so the metadata csv row order defines it.
fn load_barcodes_via_metadata(path: &Path, expected: usize) -> Result<Vec<String>, Error> {
    let file = File::open(path).with_context(|| path.display().to_string())?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    let bc_col = headers
        .iter()
        .position(|h| h == "barcode")
        .with_context(|| format!("{}: no barcode column", path.display()))?;
    let mut barcodes = Vec::with_capacity(expected);
    for rec in reader.records() {
        let rec = rec?;
        barcodes.push(rec.get(bc_col).unwrap_or_default().to_string());
    }
    Ok(barcodes)
}

fn gz_writer(path: impl AsRef<Path>) -> Result<BufWriter<GzEncoder<File>>, Error> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| path.display().to_string())?;
    Ok(BufWriter::new(GzEncoder::new(file, Compression::default())))
}

fn write_embedding(
    coords: &ndarray::Array2<f64>,
    barcodes: &[String],
    path: impl AsRef<Path>,
) -> Result<(), Error> {
    let mut writer = gz_writer(path)?;
    write!(writer, "barcode")?;
    for d in 0..coords.ncols() {
        write!(writer, ",pc{}", d + 1)?;
    }
    writeln!(writer)?;
    for (bc, row) in barcodes.iter().zip(coords.rows()) {
        write!(writer, "{bc}")?;
        for v in row {
            write!(writer, ",{v}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_clusters(labels: &[i16], barcodes: &[String], path: impl AsRef<Path>) -> Result<(), Error> {
    let mut writer = gz_writer(path)?;
    writeln!(writer, "barcode,cluster")?;
    for (bc, l) in barcodes.iter().zip(labels) {
        writeln!(writer, "{bc},{l}")?;
    }
    Ok(())
}

fn write_edges(graph: &TrajectoryGraph, path: impl AsRef<Path>) -> Result<(), Error> {
    let mut writer = gz_writer(path)?;
    writeln!(writer, "source,target,length")?;
    for (a, b, w) in graph.edges() {
        writeln!(writer, "{a},{b},{w}")?;
    }
    Ok(())
}

fn write_pseudotime(values: &[Option<f64>], barcodes: &[String], path: impl AsRef<Path>) -> Result<(), Error> {
    let mut writer = gz_writer(path)?;
    writeln!(writer, "barcode,pseudotime")?;
    for (bc, v) in barcodes.iter().zip(values) {
        match v {
            Some(v) => writeln!(writer, "{bc},{v}")?,
            None => writeln!(writer, "{bc},NA")?,
        }
    }
    Ok(())
}
