//! Reading sets from disk and writing results back as text.

use std::io::Write;

use gia::aggregate::Aggregator;
use gia::bed::{read_set, write_set, write_table};
use gia::commands::IntersectCommand;
use gia::prelude::*;
use tempfile::NamedTempFile;

fn create_temp_bed(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_intersect_files_to_text() {
    let a = create_temp_bed("chr1\t100\t200\tgene\n");
    let b = create_temp_bed("# peaks\nchr1\t150\t160\tpeak\n");

    let options = SetOptions::default();
    let a = read_set(a.path(), false, &[] as &[&str], &options).unwrap();
    let b = read_set(b.path(), false, &[] as &[&str], &options).unwrap();

    let out = IntersectCommand::new().intersect(&a, &b).unwrap();
    let mut text = Vec::new();
    write_set(&mut text, &out, true).unwrap();

    let text = String::from_utf8(text).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "chrom\tstart\tend\tname.x\tstart.y\tend.y\tstrand.y\tname.y\t.overlap",
            "chr1\t100\t200\tgene\t150\t160\t.\tpeak\t10",
        ]
    );
}

#[test]
fn test_header_schema_and_summarise() {
    let file = create_temp_bed(
        "chrom\tstart\tend\tgene\texpr\n\
         chr1\t0\t10\tA\t1.5\n\
         chr1\t20\t30\tA\t2.5\n\
         chr2\t0\t10\tB\tNA\n",
    );
    let set = read_set(file.path(), true, &["gene"], &SetOptions::default()).unwrap();
    assert_eq!(set.num_groups(), 2);

    let table = Aggregator::new(&["gene"])
        .summarise("total", "expr", "sum")
        .unwrap()
        .summarise("n", "expr", "count")
        .unwrap()
        .aggregate(&set)
        .unwrap();

    let mut text = Vec::new();
    write_table(&mut text, &table, true).unwrap();
    assert_eq!(
        String::from_utf8(text).unwrap(),
        "gene\ttotal\tn\nA\t4\t2\nB\t.\t0\n"
    );
}

#[test]
fn test_genome_file_bounds() {
    let genome_file = create_temp_bed("chr1\t1000\nchr2\t500\n");
    let genome = Genome::from_file(genome_file.path()).unwrap();
    let bed = create_temp_bed("chr2\t400\t600\n");

    let strict = SetOptions::default().with_genome(&genome);
    assert!(matches!(
        read_set(bed.path(), false, &[] as &[&str], &strict),
        Err(BedError::OutOfBounds { .. })
    ));

    let clipped = read_set(
        bed.path(),
        false,
        &[] as &[&str],
        &strict.with_bounds(BoundsPolicy::Clip),
    )
    .unwrap();
    assert_eq!(clipped.records()[0].end(), 500);
}

#[test]
fn test_cells_round_trip_unchanged() {
    let content = "chrom\tstart\tend\tid\tsignal\n\
                   chr1\t0\t10\t007\t1.50\n\
                   chr1\t20\t30\tg2\t1e3\n\
                   chr2\t5\t9\t12\t-0.25\n";
    let file = create_temp_bed(content);
    let set = read_set(file.path(), true, &[] as &[&str], &SetOptions::default()).unwrap();

    let mut text = Vec::new();
    write_set(&mut text, &set, true).unwrap();
    assert_eq!(String::from_utf8(text).unwrap(), content);

    // Text cells that read as numbers still reduce numerically.
    let table = Aggregator::new(&["chrom"])
        .summarise("total", "signal", "sum")
        .unwrap()
        .aggregate(&set)
        .unwrap();
    let mut text = Vec::new();
    write_table(&mut text, &table, false).unwrap();
    assert_eq!(String::from_utf8(text).unwrap(), "chr1\t1001.5\nchr2\t-0.25\n");
}
