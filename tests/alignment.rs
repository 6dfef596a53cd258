use isodef_rs::alignment::{self, ReadAlignment, Segment};
use isodef_rs::fasta::revcomp;
use isodef_rs::locus::{Locus, LocusFormat};
use isodef_rs::types::Strand;
use noodles::core::Position;
use noodles::sam::alignment::io::Write as _;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::cigar::{Op, op::Kind};
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::{Data, RecordBuf, Sequence, data::field::Value};
use noodles::sam::header::record::value::{Map, map::ReferenceSequence};
use noodles::{bam, sam};
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;

fn bases(n: usize) -> Vec<u8> {
    b"ACGGTCATTG".iter().copied().cycle().take(n).collect()
}

fn record(
    name: &str,
    flags: Flags,
    start: usize,
    ops: &[(Kind, usize)],
    strand_tag: Option<(Tag, u8)>,
) -> RecordBuf {
    let query_len: usize = ops
        .iter()
        .filter(|(k, _)| k.consumes_read())
        .map(|(_, len)| len)
        .sum();
    let mut out = RecordBuf::default();
    *out.name_mut() = Some(name.as_bytes().to_vec().into());
    *out.flags_mut() = flags;
    *out.reference_sequence_id_mut() = Some(0);
    *out.alignment_start_mut() = Some(Position::try_from(start).unwrap());
    *out.cigar_mut() = ops.iter().map(|&(kind, len)| Op::new(kind, len)).collect();
    *out.sequence_mut() = Sequence::from(bases(query_len));
    if let Some((tag, strand)) = strand_tag {
        let mut data = Data::default();
        data.insert(tag, Value::Character(strand));
        *out.data_mut() = data;
    }
    out
}

fn write_bam(path: &Path, records: &[RecordBuf]) {
    let header = sam::Header::builder()
        .add_reference_sequence(
            "chr1",
            Map::<ReferenceSequence>::new(NonZeroUsize::new(100_000).unwrap()),
        )
        .build();
    let mut writer = bam::io::Writer::new(File::create(path).unwrap());
    writer.write_header(&header).unwrap();
    for r in records {
        writer.write_alignment_record(&header, r).unwrap();
    }
    // Dropping the writer finishes the BGZF stream.
    drop(writer);
}

fn load(records: &[RecordBuf]) -> Vec<ReadAlignment> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chr1~900~3000.bam");
    write_bam(&path, records);
    let locus = Locus::from_path(&path).unwrap();
    assert_eq!(locus.format, LocusFormat::Bam);
    alignment::load_reads(&locus).unwrap()
}

fn by_name<'a>(reads: &'a [ReadAlignment], name: &str) -> &'a ReadAlignment {
    reads.iter().find(|r| r.name == name).unwrap()
}

#[test]
fn cigar_skips_split_blocks_and_deletions_do_not() {
    let ops = [
        (Kind::SoftClip, 2),
        (Kind::Match, 100),
        (Kind::Deletion, 5),
        (Kind::Match, 95),
        (Kind::Skip, 300),
        (Kind::Match, 100),
        (Kind::Insertion, 3),
        (Kind::Match, 50),
    ];
    let reads = load(&[record("spliced", Flags::empty(), 1001, &ops, None)]);

    assert_eq!(reads.len(), 1);
    let r = &reads[0];
    assert_eq!(r.chrom, "chr1");
    assert_eq!(
        r.blocks,
        [Segment { start: 1000, end: 1200 }, Segment { start: 1500, end: 1650 }]
    );
    assert_eq!(r.introns(50), [(1200, 1500)]);
    assert_eq!(r.strand, Strand::Forward);
    assert_eq!(r.sequence, bases(350));
}

#[test]
fn strand_follows_xs_then_ts_then_orientation() {
    let ops = [(Kind::Match, 200), (Kind::Skip, 400), (Kind::Match, 100)];
    let xs = Tag::new(b'X', b'S');
    let ts = Tag::new(b't', b's');
    let reads = load(&[
        record("xs_minus", Flags::empty(), 2001, &ops, Some((xs, b'-'))),
        record("ts_on_reverse", Flags::REVERSE_COMPLEMENTED, 2001, &ops, Some((ts, b'+'))),
        record("ts_on_forward", Flags::empty(), 2001, &ops, Some((ts, b'-'))),
        record("untagged_reverse", Flags::REVERSE_COMPLEMENTED, 2001, &ops, None),
        record("untagged_forward", Flags::empty(), 2001, &ops, None),
    ]);

    assert_eq!(by_name(&reads, "xs_minus").strand, Strand::Reverse);
    assert_eq!(by_name(&reads, "ts_on_reverse").strand, Strand::Reverse);
    assert_eq!(by_name(&reads, "ts_on_forward").strand, Strand::Reverse);
    assert_eq!(by_name(&reads, "untagged_reverse").strand, Strand::Reverse);
    assert_eq!(by_name(&reads, "untagged_forward").strand, Strand::Forward);
    assert_eq!(
        by_name(&reads, "xs_minus").blocks,
        [Segment { start: 2000, end: 2200 }, Segment { start: 2600, end: 2700 }]
    );
}

#[test]
fn reverse_reads_are_stored_in_transcript_orientation() {
    let ops = [(Kind::Match, 120)];
    let reads = load(&[record("rev", Flags::REVERSE_COMPLEMENTED, 1500, &ops, None)]);
    assert_eq!(reads[0].sequence, revcomp(&bases(120)));
    assert_eq!(reads[0].endpoints(), Some((1619, 1499)));
}

#[test]
fn unmapped_and_secondary_records_are_skipped() {
    let ops = [(Kind::Match, 100)];
    let reads = load(&[
        record("primary", Flags::empty(), 1001, &ops, None),
        record("secondary", Flags::SECONDARY, 1001, &ops, None),
        record("unmapped", Flags::UNMAPPED, 1001, &ops, None),
    ]);
    let names: Vec<&str> = reads.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["primary"]);
}
