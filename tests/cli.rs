use clap::Parser;
use isodef_rs::cli::Args;
use std::path::PathBuf;

#[test]
fn infile_names_the_locus_directory() {
    let args = Args::try_parse_from(["isodef-rs", "-p", "out", "-i", "loci"]).unwrap();
    assert_eq!(args.loci_dir(), PathBuf::from("loci"));

    let args = Args::try_parse_from(["isodef-rs", "--path", "out", "--infile", "other"]).unwrap();
    assert_eq!(args.loci_dir(), PathBuf::from("other"));
}

#[test]
fn locus_directory_defaults_under_output_path() {
    let args = Args::try_parse_from(["isodef-rs", "-p", "out"]).unwrap();
    assert_eq!(args.loci_dir(), PathBuf::from("out").join("tmp_SS"));
    assert!(args.annotation().is_none());
    assert!(args.polya_whitelist_enabled());
}

#[test]
fn literal_none_annotation_and_disabled_whitelist() {
    let args = Args::try_parse_from(["isodef-rs", "-p", "out", "-g", "None", "-W", "1,0"]).unwrap();
    assert!(args.annotation().is_none());
    assert!(!args.polya_whitelist_enabled());

    let config = args.to_config();
    assert_eq!(config.junction_motifs, ["GTAG", "GCAG", "ATAC"]);
}
